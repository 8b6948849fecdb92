pub mod accounts;
pub mod awards;
pub mod credentials;
pub mod cycles;
pub mod forms;
pub mod nominations;
