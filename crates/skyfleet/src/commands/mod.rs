pub mod deploy;
pub mod price;
pub mod probe;
pub mod scenario;
pub mod status;
