pub(crate) mod harvest;
