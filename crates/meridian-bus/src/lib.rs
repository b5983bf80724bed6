pub mod bus;
pub mod loopback;
pub mod nats;
pub mod wildcard;

pub use bus::{Bus, Chunk, ChunkStream, Message, Subscription};
pub use loopback::LoopbackBus;
pub use nats::NatsBus;
