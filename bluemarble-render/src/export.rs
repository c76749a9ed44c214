//! PNG encoding of template pieces and composited tiles.

use tracing::trace;

use crate::buffer::RgbaBuffer;

/// Value of the `Software` tEXt chunk written into every PNG.
pub const SOFTWARE_TAG: &str = "BlueMarble";

/// Encode an RGBA buffer as an 8-bit RGBA PNG in memory.
///
/// Uses the `png` crate directly so the output is byte-for-byte deterministic
/// for identical pixels, and so a `Software` tEXt chunk can be embedded.
pub fn encode_png(buffer: &RgbaBuffer) -> crate::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, buffer.width, buffer.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Default);
        encoder.add_text_chunk("Software".to_string(), SOFTWARE_TAG.to_string())?;

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&buffer.pixels)?;
        writer.finish()?;
    }
    trace!(
        width = buffer.width,
        height = buffer.height,
        bytes = bytes.len(),
        "Encoded PNG"
    );
    Ok(bytes)
}
