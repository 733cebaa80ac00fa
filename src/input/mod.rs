mod serial;

pub use serial::SerialSource;
