//! Core library for reading persisted coherent-mode decompositions of
//! undulator radiation: autocorrelation datasets stored as HDF5
//! containers or legacy npz archives, exposed through typed domain
//! objects and a read-only query surface.

pub mod beam;
pub mod domain;
pub mod info;
pub mod reader;
pub mod storage;
pub mod twoform;
pub mod wavefront;

pub use beam::{SigmaMatrix, Undulator};
pub use domain::{AfError, AfErrorCategory, AfResult, DatasetFormat, RawRecord, WavefrontArrays};
pub use info::InfoBlock;
pub use reader::{AfReader, DatasetSummary, MODE_SCAN_EXHAUSTED, SamplingInfo};
pub use storage::{DatasetPayload, LoadedDataset};
pub use twoform::{ModeStorage, Twoform};
pub use wavefront::Wavefront;
