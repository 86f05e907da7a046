pub mod bitstream;
pub mod crypt;
pub mod decompress;
pub mod gameinfo;
pub mod palette;
pub mod picture;
pub mod rasterizer;
pub mod resource;
pub mod restype;
pub mod storage;
pub mod tracer;
pub mod volume;
