mod conn;
mod resultset;
mod stream;

pub use conn::Conn;
pub use resultset::ResultSet;
pub use stream::{PacketStream, Transport};
