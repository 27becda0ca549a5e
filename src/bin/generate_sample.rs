use std::path::PathBuf;

use image::{GrayImage, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;

/// Box-Muller transform for normal distribution
fn gauss(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

/// A filled disc standing in for the foreground class.
struct Disc {
    cx: f64,
    cy: f64,
    radius: f64,
}

impl Disc {
    fn random(rng: &mut StdRng) -> Self {
        let radius = rng.gen_range(6.0..(HEIGHT as f64 / 3.0));
        Disc {
            cx: rng.gen_range(radius..(WIDTH as f64 - radius)),
            cy: rng.gen_range(radius..(HEIGHT as f64 - radius)),
            radius,
        }
    }

    fn contains(&self, x: u32, y: u32) -> bool {
        let dx = x as f64 - self.cx;
        let dy = y as f64 - self.cy;
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

fn generate_pair(rng: &mut StdRng) -> (GrayImage, GrayImage) {
    let disc = Disc::random(rng);
    let brightness = rng.gen_range(40.0..120.0);

    let mut image = GrayImage::new(WIDTH, HEIGHT);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let background = 30.0 + 60.0 * (x as f64 / WIDTH as f64);
        let foreground = if disc.contains(x, y) { brightness } else { 0.0 };
        let value = background + foreground + gauss(rng, 0.0, 6.0);
        *pixel = Luma([value.clamp(0.0, 255.0) as u8]);
    }

    let label = GrayImage::from_fn(WIDTH, HEIGHT, |x, y| {
        Luma([if disc.contains(x, y) { 255 } else { 0 }])
    });

    (image, label)
}

fn main() {
    let mut args = std::env::args().skip(1);
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| "sample_data".to_string()));
    let count: usize = args
        .next()
        .map(|n| n.parse().expect("COUNT must be a positive integer"))
        .unwrap_or(24);

    std::fs::create_dir_all(&output_dir).expect("Failed to create output directory");

    let mut rng = StdRng::seed_from_u64(42);
    for i in 0..count {
        let (image, label) = generate_pair(&mut rng);
        image
            .save(output_dir.join(format!("sample_{i:03}_image.png")))
            .expect("Failed to write image");
        label
            .save(output_dir.join(format!("sample_{i:03}_label.png")))
            .expect("Failed to write label");
    }

    println!(
        "Wrote {count} image/label pairs ({WIDTH}x{HEIGHT}) to {}",
        output_dir.display()
    );
}
