pub mod bitmap;
pub mod error;
pub mod heap;
pub mod value;


pub use bitmap::{Bitmap, Bits};
pub use error::MemoryError;
pub use heap::{Heap, HeapConfig, DEFAULT_CELL_SIZE, DEFAULT_HEAP_SIZE};
pub use value::{Address, Region, SlotKind, StackEntry};
