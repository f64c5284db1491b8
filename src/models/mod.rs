//! Example models built on the public modeling API.
//!
//! These models exercise the kernel end to end and double as references for
//! writing custom atomic and coupled models.
//!
//! # Available Models
//!
//! ## Experimental Frame
//! - [`Generator`] - Emits numbered jobs at a fixed period
//! - [`Processor`] - Serves one job at a time
//! - [`Transducer`] - Measures turnaround and throughput, then stops the generator
//! - [`ef`], [`efp`], [`gpt`] - The classic coupled arrangements of the three
//!
//! ## DEVStone
//! - [`devstone`] - LI, HI and HO synthetic benchmark trees
//! - [`DevstoneGenerator`] - Bounded job source for driving a DEVStone tree

pub mod devstone;
pub mod efp;
pub mod generator;
pub mod processor;
pub mod transducer;

pub use devstone::{
    devstone, devstone_bench, DevstoneAtomic, DevstoneError, DevstoneGenerator, DevstoneTiming,
    Topology,
};
pub use efp::{ef, efp, gpt};
pub use generator::Generator;
pub use processor::Processor;
pub use transducer::{ReportHandle, Transducer, TransducerReport};
