pub const NEW_FLOAT: u8 = 70;
pub const SMALL_INT: u8 = 97;
pub const INT: u8 = 98;
pub const ATOM: u8 = 100;
pub const SMALL_TUPLE: u8 = 104;
pub const LARGE_TUPLE: u8 = 105;
pub const NIL: u8 = 106;
pub const STRING: u8 = 107;
pub const LIST: u8 = 108;
pub const BINARY: u8 = 109;
pub const SMALL_BIG: u8 = 110;
pub const LARGE_BIG: u8 = 111;
pub const SMALL_ATOM: u8 = 115;
pub const ATOM_UTF8: u8 = 118;
pub const SMALL_ATOM_UTF8: u8 = 119;
pub const MAP: u8 = 116;
