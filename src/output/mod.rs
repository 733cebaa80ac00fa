mod serial;

pub use serial::SerialSink;
