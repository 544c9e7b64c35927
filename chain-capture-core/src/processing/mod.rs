pub mod capture_buffer;
pub mod filter;
pub mod level;
pub mod pcm;
pub mod spectrum;
pub mod wav_format;
