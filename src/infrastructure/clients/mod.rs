pub(crate) mod greenhouse;
pub(crate) mod icims;
pub(crate) mod workday;
