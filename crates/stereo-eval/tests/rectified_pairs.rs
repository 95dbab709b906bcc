use rand::{rngs::StdRng, Rng, SeedableRng};
use stereo_eval::{
    report::Validation,
    sequence::{evaluate_sequence, sequence_dir, StereoType},
    validator::{EpipolarValidator, ValidationParams},
    verdict::RectificationQuality,
};
use stereo_image::Image;
use stereo_io::png::{write_image_png_rgb8, write_image_png_rgba8};

const WIDTH: usize = 320;
const HEIGHT: usize = 240;
const DISPARITY: usize = 16;

/// Gray texture of random gaussian blobs, `WIDTH + DISPARITY` columns wide.
fn texture(seed: u64) -> Vec<u8> {
    let cols = WIDTH + DISPARITY;
    let mut rng = StdRng::seed_from_u64(seed);
    let blobs: Vec<(f32, f32, f32, f32)> = (0..220)
        .map(|_| {
            (
                rng.random_range(0.0..cols as f32),
                rng.random_range(0.0..HEIGHT as f32),
                rng.random_range(2.5..7.0),
                rng.random_range(-0.6..0.6),
            )
        })
        .collect();

    let mut values = vec![0.5f32; cols * HEIGHT];
    for (cx, cy, sigma, amplitude) in blobs {
        let radius = (3.0 * sigma) as isize;
        let (x0, y0) = (cx as isize, cy as isize);
        for y in (y0 - radius).max(0)..(y0 + radius + 1).min(HEIGHT as isize) {
            for x in (x0 - radius).max(0)..(x0 + radius + 1).min(cols as isize) {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                values[y as usize * cols + x as usize] +=
                    amplitude * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
            }
        }
    }
    values
        .into_iter()
        .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect()
}

/// RGB crop of the texture starting at column `x0`.
fn crop(texture: &[u8], x0: usize) -> Image<u8, 3> {
    let cols = WIDTH + DISPARITY;
    let data = (0..HEIGHT)
        .flat_map(|y| texture[y * cols + x0..y * cols + x0 + WIDTH].iter())
        .flat_map(|&v| [v, v, v])
        .collect();
    Image::new([WIDTH, HEIGHT].into(), data).unwrap()
}

/// Opaque RGBA crop, the layout of rendered `rgba_*.png` frames.
fn crop_rgba(texture: &[u8], x0: usize) -> Image<u8, 4> {
    let data = crop(texture, x0)
        .as_slice()
        .chunks_exact(3)
        .flat_map(|px| [px[0], px[1], px[2], 255])
        .collect();
    Image::new([WIDTH, HEIGHT].into(), data).unwrap()
}

fn validator() -> EpipolarValidator {
    EpipolarValidator::new(ValidationParams {
        min_matches: 20,
        ..Default::default()
    })
}

#[test]
fn identical_images_are_excellent() -> Result<(), Box<dyn std::error::Error>> {
    let img = crop(&texture(3), 0);
    let outcome = validator().validate_rgb(&img, &img)?;

    let report = outcome.report().ok_or(format!("not graded: {outcome}"))?;
    assert!(report.stats.mean < 1e-3, "mean {}", report.stats.mean);
    assert_eq!(report.verdict, RectificationQuality::Excellent);
    Ok(())
}

#[test]
fn horizontally_shifted_pair_is_rectified() -> Result<(), Box<dyn std::error::Error>> {
    let tex = texture(11);
    let tmp = tempfile::tempdir()?;
    let left = tmp.path().join("left.png");
    let right = tmp.path().join("right.png");
    write_image_png_rgb8(&left, &crop(&tex, 0))?;
    write_image_png_rgb8(&right, &crop(&tex, DISPARITY))?;

    let outcome = validator().validate_files(&left, &right)?;
    let report = outcome.report().ok_or(format!("not graded: {outcome}"))?;
    assert!(report.inlier_count >= 20);
    assert!(report.inlier_count <= report.match_count);
    assert_ne!(report.verdict, RectificationQuality::Poor);
    Ok(())
}

#[test]
fn sequence_of_shifted_pairs() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let dir = sequence_dir(tmp.path(), StereoType::PureTranslation, None, "0000")?;
    let left_dir = dir.join("left_camera").join("rgba");
    let right_dir = dir.join("right_camera").join("rgba");
    std::fs::create_dir_all(&left_dir)?;
    std::fs::create_dir_all(&right_dir)?;

    for frame in 0..2u64 {
        let tex = texture(100 + frame);
        let name = format!("rgba_{frame:05}.png");
        write_image_png_rgba8(left_dir.join(&name), &crop_rgba(&tex, 0))?;
        write_image_png_rgba8(right_dir.join(&name), &crop_rgba(&tex, DISPARITY))?;
    }

    let (results, summary) = evaluate_sequence(&validator(), &dir)?;
    assert_eq!(results.len(), 2);
    assert_eq!(summary.frames_processed, 2);
    assert_eq!(summary.graded(), 2, "{summary}");
    assert_eq!(summary.poor, 0);
    assert!(summary.mean_of_means.is_some());

    let json = serde_json::to_value(&summary)?;
    assert_eq!(json["frames_processed"], 2);
    assert!(matches!(
        serde_json::to_value(&results[0].outcome)?["validated"]["status"].as_str(),
        Some("ok")
    ));
    Ok(())
}

#[test]
fn blank_pair_is_reported_not_raised() -> Result<(), Box<dyn std::error::Error>> {
    let img = Image::<u8, 3>::from_size_val([WIDTH, HEIGHT].into(), 90)?;
    let outcome = validator().validate_rgb(&img, &img)?;
    assert!(matches!(outcome, Validation::Insufficient(_)));
    assert_eq!(outcome.verdict(), None);
    Ok(())
}
