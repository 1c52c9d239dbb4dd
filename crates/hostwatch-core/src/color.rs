//! Usage-to-colour mapping shared by cards, GPU boxes and pie slices.
//!
//! Usage below the red threshold walks a perceptual (CIE LCH) gradient from
//! teal-green to neutral gray; anything at or above the threshold is solid red.

use std::fmt;

/// An sRGB colour with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowest usage colour (`#00b894`).
    pub const COOL: Rgb = Rgb::new(0x00, 0xb8, 0x94);
    /// Gradient end just below the red threshold (`#b2bec3`).
    pub const NEUTRAL: Rgb = Rgb::new(0xb2, 0xbe, 0xc3);
    /// Saturated usage (`#d63031`).
    pub const HOT: Rgb = Rgb::new(0xd6, 0x30, 0x31);
    /// Free space slice (`#ffeaa7`).
    pub const FREE: Rgb = Rgb::new(0xff, 0xea, 0xa7);
    /// Stale border / timestamp.
    pub const ALERT: Rgb = Rgb::new(0xff, 0x00, 0x00);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);

    /// `#rrggbb` form.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Relative luminance on the 0..=255 scale (Rec. 709 weights).
    pub fn luminance(&self) -> f64 {
        0.2126 * self.r as f64 + 0.7152 * self.g as f64 + 0.0722 * self.b as f64
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Default fraction at which usage turns solid red.
pub const RED_THRESHOLD: f64 = 0.85;

/// Map a usage ratio to a colour.
///
/// `value >= red` → [`Rgb::HOT`]. Below that, `value / red` is mixed between
/// [`Rgb::COOL`] and [`Rgb::NEUTRAL`] in LCH space (shorter hue arc) and
/// clamped back into sRGB. Negative or NaN ratios read as 0.
pub fn color_interpolate(value: f64, red: f64) -> Rgb {
    if value >= red {
        return Rgb::HOT;
    }
    let t = if red > 0.0 && value > 0.0 {
        value / red
    } else {
        0.0
    };
    mix_lch(Rgb::COOL, Rgb::NEUTRAL, t)
}

/// Pick black or white text for legibility over `background`.
///
/// Luminance strictly above 128 is a light background and gets black text;
/// 128 and below get white.
pub fn auto_contrast(background: Rgb) -> Rgb {
    if background.luminance() > 128.0 {
        Rgb::BLACK
    } else {
        Rgb::WHITE
    }
}

// ---------------------------------------------------------------------------
// LCH mixing (CIE Lab, D65 white point)
// ---------------------------------------------------------------------------

const WHITE_D65: [f64; 3] = [0.95047, 1.0, 1.08883];
const EPSILON: f64 = 216.0 / 24389.0;
const KAPPA: f64 = 24389.0 / 27.0;

#[derive(Debug, Clone, Copy)]
struct Lch {
    l: f64,
    c: f64,
    h: f64,
}

fn srgb_to_linear(c: u8) -> f64 {
    let c = c as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f64) -> u8 {
    let v = if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

fn lab_f(t: f64) -> f64 {
    if t > EPSILON {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

fn lab_f_inv(t: f64) -> f64 {
    let cube = t * t * t;
    if cube > EPSILON {
        cube
    } else {
        (116.0 * t - 16.0) / KAPPA
    }
}

fn to_lch(c: Rgb) -> Lch {
    let (r, g, b) = (srgb_to_linear(c.r), srgb_to_linear(c.g), srgb_to_linear(c.b));
    let x = 0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b;
    let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175_0 * b;
    let z = 0.019_333_9 * r + 0.119_192_0 * g + 0.950_304_1 * b;

    let fx = lab_f(x / WHITE_D65[0]);
    let fy = lab_f(y / WHITE_D65[1]);
    let fz = lab_f(z / WHITE_D65[2]);

    let l = 116.0 * fy - 16.0;
    let a = 500.0 * (fx - fy);
    let bb = 200.0 * (fy - fz);
    Lch {
        l,
        c: a.hypot(bb),
        h: bb.atan2(a).to_degrees().rem_euclid(360.0),
    }
}

fn from_lch(lch: Lch) -> Rgb {
    let (sin, cos) = lch.h.to_radians().sin_cos();
    let a = lch.c * cos;
    let bb = lch.c * sin;

    let fy = (lch.l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - bb / 200.0;

    let x = WHITE_D65[0] * lab_f_inv(fx);
    let y = WHITE_D65[1] * lab_f_inv(fy);
    let z = WHITE_D65[2] * lab_f_inv(fz);

    let r = 3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z;
    let g = -0.969_266_0 * x + 1.876_010_8 * y + 0.041_556_0 * z;
    let b = 0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z;
    Rgb::new(linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(b))
}

fn mix_lch(from: Rgb, to: Rgb, t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let a = to_lch(from);
    let b = to_lch(to);

    let mut dh = b.h - a.h;
    if dh > 180.0 {
        dh -= 360.0;
    } else if dh < -180.0 {
        dh += 360.0;
    }

    from_lch(Lch {
        l: a.l + (b.l - a.l) * t,
        c: a.c + (b.c - a.c) * t,
        h: a.h + dh * t,
    })
}
