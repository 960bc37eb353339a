// Audio I/O module
// Handles WAV decoding into mono waveforms and 16-bit PCM encoding

pub mod encode;
pub mod ingest;

pub use encode::encode_wav;
pub use ingest::{decode_wav, fold_to_mono, load_wav, AudioError, Waveform};
