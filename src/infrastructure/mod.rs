mod browser;
mod clients;
mod scrapers;
mod storage;

pub use browser::{
    apple::AppleScraper, workday_board::WorkdayBoardScraper, BrowserSession,
};
pub use clients::{
    greenhouse::GreenhouseClient,
    icims::IcimsClient,
    workday::{WorkdayBoard, WorkdayClient},
};
pub use storage::fs_store::FileSystemStore;
