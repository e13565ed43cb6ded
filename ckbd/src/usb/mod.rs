//! USB transport boundary: the write queue, the `UsbTransport`/`UsbHandle`
//! trait pair, and the wire-protocol seam.
pub mod protocol;
pub mod queue;
pub mod transport;
