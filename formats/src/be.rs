use bytemuck::{Pod, Zeroable};

/// A big-endian `u32` header word, as stored by Sony's VAG tools.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Be32([u8; 4]);

impl Be32 {
    pub fn get(self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl From<u32> for Be32 {
    fn from(x: u32) -> Self {
        Be32(x.to_be_bytes())
    }
}

impl std::fmt::Debug for Be32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x} (be)", self.get())
    }
}

#[cfg(test)]
#[test]
fn words_store_msb_first() {
    let x = Be32::from(0x1122_3344);
    assert_eq!(bytemuck::bytes_of(&x), &[0x11, 0x22, 0x33, 0x44]);
    assert_eq!(x.get(), 0x1122_3344);
    assert_eq!(format!("{x:?}"), "0x11223344 (be)");
}
