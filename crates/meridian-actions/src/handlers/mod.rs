mod bus_delegate;
mod command_execute;
mod image_save;
mod web_search;

pub use bus_delegate::BusDelegateHandler;
pub use command_execute::CommandExecuteHandler;
pub use image_save::ImageSaveHandler;
pub use web_search::WebSearchHandler;
