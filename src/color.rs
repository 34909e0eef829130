use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues,
/// formatted as `#rrggbb`.
pub fn generate_palette(n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            let rgb: Srgb<u8> = rgb.into_format();
            format!("#{:02x}{:02x}{:02x}", rgb.red, rgb.green, rgb.blue)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn distinct_hex_colours() {
        let colours = generate_palette(4);
        assert_eq!(colours.len(), 4);
        for c in &colours {
            assert_eq!(c.len(), 7);
            assert!(c.starts_with('#'));
        }
        let unique: BTreeSet<&String> = colours.iter().collect();
        assert_eq!(unique.len(), 4);
        assert!(generate_palette(0).is_empty());
    }
}
