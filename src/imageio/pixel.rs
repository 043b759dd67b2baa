//! Pixel remapping.
//!
//! The backend hands out native-endian `u32` words holding `a<<24 | r<<16 |
//! g<<8 | b`. Consumers want RGBA8 in memory, so every word is rewritten in
//! place so that its bytes read `r, g, b, a` whatever the host endianness.

/// Remap one backend ARGB word to an RGBA8 word.
#[inline]
pub fn argb_to_rgba(pixel: u32) -> u32 {
    let a = (pixel >> 24) as u8;
    let r = (pixel >> 16) as u8;
    let g = (pixel >> 8) as u8;
    let b = pixel as u8;
    u32::from_ne_bytes([r, g, b, a])
}

/// Remap a whole buffer in place.
pub fn remap_argb_to_rgba(pixels: &mut [u32]) {
    for pixel in pixels.iter_mut() {
        *pixel = argb_to_rgba(*pixel);
    }
}

/// Flatten remapped pixels into RGBA8 bytes.
pub fn rgba_bytes(pixels: &[u32]) -> Vec<u8> {
    pixels.iter().flat_map(|p| p.to_ne_bytes()).collect()
}
