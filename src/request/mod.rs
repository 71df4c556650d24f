pub mod climate_request;
pub mod history;
pub mod intent;
