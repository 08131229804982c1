pub mod secs {
    pub const REQUEST: u64 = 20;
    pub const THUMBNAIL: u64 = 10;
    pub const CONNECT: u64 = 5;
}
