use image::{Rgb, RgbImage};
use logo_redaction::{
    detect, redact, Error, MatchRegion, RedactOptions, RedactionEngine, Template,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

/// A 10x10 high-contrast pattern with no repeating structure.
fn logo() -> Template {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let img = RgbImage::from_fn(10, 10, |_, _| {
        if rng.random_bool(0.5) {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    });
    Template::from_image(img).unwrap()
}

fn paste(page: &mut RgbImage, tpl: &Template, x: u32, y: u32) {
    for (tx, ty, px) in tpl.image().enumerate_pixels() {
        page.put_pixel(x + tx, y + ty, *px);
    }
}

fn two_tone_page(tpl: &Template) -> (RgbImage, Rgb<u8>, Rgb<u8>) {
    let left = Rgb([200, 30, 30]);
    let right = Rgb([30, 30, 200]);
    let mut page = RgbImage::from_fn(120, 60, |x, _| if x < 60 { left } else { right });
    paste(&mut page, tpl, 20, 20);
    paste(&mut page, tpl, 85, 20);
    (page, left, right)
}

#[test]
fn single_pasted_logo_is_found_and_painted_gray() {
    let tpl = logo();
    let mut page = RgbImage::from_pixel(100, 100, GRAY);
    paste(&mut page, &tpl, 20, 20);

    let regions = detect(&page, &tpl, 0.8);
    assert_eq!(regions, vec![MatchRegion::new(20, 20, 10, 10)]);

    let out = redact(&page, &regions, 5);
    assert!(out.pixels().all(|p| *p == GRAY));
}

#[test]
fn oversized_template_yields_no_matches() {
    let tpl = logo();
    let narrow = RgbImage::from_pixel(8, 50, GRAY);
    let short = RgbImage::from_pixel(50, 9, GRAY);
    assert!(detect(&narrow, &tpl, 0.8).is_empty());
    assert!(detect(&short, &tpl, 0.8).is_empty());
}

#[test]
fn uniform_template_never_matches() {
    let tpl = Template::from_image(RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]))).unwrap();
    let mut page = RgbImage::from_pixel(100, 100, GRAY);
    paste(&mut page, &tpl, 20, 20);
    paste(&mut page, &logo(), 50, 50);
    assert!(detect(&page, &tpl, 0.8).is_empty());
    // Every window scores exactly 0 rather than NaN.
    assert_eq!(detect(&page, &tpl, 0.0).len(), 91 * 91);
}

#[test]
fn two_matches_get_their_own_fill() {
    let tpl = logo();
    let (page, left, right) = two_tone_page(&tpl);

    let regions = detect(&page, &tpl, 0.8);
    assert_eq!(
        regions,
        vec![
            MatchRegion::new(20, 20, 10, 10),
            MatchRegion::new(85, 20, 10, 10)
        ]
    );

    let out = redact(&page, &regions, 5);
    for (x, y, px) in out.enumerate_pixels() {
        let expected = if x < 60 { left } else { right };
        assert_eq!(*px, expected, "pixel ({x}, {y})");
    }
}

#[test]
fn matches_on_page_edges_are_clamped() {
    let tpl = logo();
    let mut page = RgbImage::from_pixel(60, 40, GRAY);
    paste(&mut page, &tpl, 0, 15);
    paste(&mut page, &tpl, 50, 15);

    let regions = detect(&page, &tpl, 0.8);
    assert_eq!(
        regions,
        vec![
            MatchRegion::new(0, 15, 10, 10),
            MatchRegion::new(50, 15, 10, 10)
        ]
    );

    let out = redact(&page, &regions, 5);
    assert!(out.pixels().all(|p| *p == GRAY));
}

#[test]
fn redact_without_regions_is_identity() {
    let mut rng = StdRng::seed_from_u64(11);
    let page = RgbImage::from_fn(40, 30, |_, _| Rgb([rng.random(), rng.random(), rng.random()]));
    assert_eq!(redact(&page, &[], 5), page);
}

#[test]
fn detect_and_redact_are_deterministic() {
    let tpl = logo();
    let (page, _, _) = two_tone_page(&tpl);
    let first = detect(&page, &tpl, 0.5);
    let second = detect(&page, &tpl, 0.5);
    assert_eq!(first, second);
    assert_eq!(redact(&page, &first, 5), redact(&page, &second, 5));
}

#[test]
fn regions_stay_inside_the_page() {
    let tpl = logo();
    let mut rng = StdRng::seed_from_u64(99);
    let page = RgbImage::from_fn(37, 23, |_, _| {
        let v = if rng.random_bool(0.5) { 255 } else { 0 };
        Rgb([v, v, v])
    });
    let regions = detect(&page, &tpl, -1.0);
    assert_eq!(regions.len(), 28 * 14);
    for r in &regions {
        assert!(r.x + tpl.width() <= page.width());
        assert!(r.y + tpl.height() <= page.height());
    }
}

#[test]
fn region_order_does_not_change_the_result() {
    let tpl = logo();
    let (page, _, _) = two_tone_page(&tpl);
    let mut regions = detect(&page, &tpl, 0.8);
    let forward = redact(&page, &regions, 5);
    regions.reverse();
    assert_eq!(redact(&page, &regions, 5), forward);
}

#[test]
fn overlapping_matches_paint_the_same_in_any_order() {
    // Every window of a linear gradient is a shifted copy of every other one.
    #[allow(clippy::cast_possible_truncation)]
    let page = RgbImage::from_fn(40, 40, |x, y| {
        Rgb([(3 * x) as u8, (3 * y) as u8, (x + y) as u8])
    });
    let crop = image::imageops::crop_imm(&page, 10, 10, 8, 8).to_image();
    let tpl = Template::from_image(crop).unwrap();

    let mut regions = detect(&page, &tpl, 0.8);
    assert!(regions.len() > 1);
    let forward = redact(&page, &regions, 5);

    regions.reverse();
    assert_eq!(redact(&page, &regions, 5), forward);

    regions.shuffle(&mut StdRng::seed_from_u64(7));
    assert_eq!(redact(&page, &regions, 5), forward);
}

#[test]
fn raising_the_threshold_never_adds_matches() {
    let tpl = logo();
    let mut rng = StdRng::seed_from_u64(3);
    let mut page = RgbImage::from_fn(50, 40, |_, _| {
        let v: u8 = rng.random();
        Rgb([v, v, v])
    });
    paste(&mut page, &tpl, 12, 9);

    let counts: Vec<usize> = [-1.0, -0.2, 0.0, 0.2, 0.5, 0.8, 0.95, 1.0]
        .iter()
        .map(|&t| detect(&page, &tpl, t).len())
        .collect();
    assert!(counts.windows(2).all(|w| w[0] >= w[1]), "{counts:?}");
    assert!(counts[counts.len() - 1] >= 1);
}

#[test]
fn engine_reports_outcome_per_page() {
    let engine = RedactionEngine::new(logo(), RedactOptions::default()).unwrap();
    let mut page = RgbImage::from_pixel(100, 100, GRAY);
    paste(&mut page, engine.template(), 20, 20);

    let outcome = engine.redact_page(&page);
    assert_eq!(outcome.regions, vec![MatchRegion::new(20, 20, 10, 10)]);
    assert!(outcome.best_score.unwrap() > 0.99);
    assert!(outcome.image.pixels().all(|p| *p == GRAY));

    let empty = engine.redact_page(&RgbImage::from_pixel(5, 5, GRAY));
    assert!(empty.regions.is_empty());
    assert!(empty.best_score.is_none());
}

#[test]
fn missing_template_fails_at_startup() {
    let result = RedactionEngine::from_path("/no/such/template.png", RedactOptions::default());
    assert!(matches!(result, Err(Error::InvalidTemplate { .. })));
}

mod files {
    use super::*;
    use logo_redaction::list_pages;

    fn engine() -> RedactionEngine {
        RedactionEngine::new(logo(), RedactOptions::default()).unwrap()
    }

    fn stamped_page(engine: &RedactionEngine, x: u32, y: u32) -> RgbImage {
        let mut page = RgbImage::from_pixel(80, 60, GRAY);
        paste(&mut page, engine.template(), x, y);
        page
    }

    #[test]
    fn template_round_trips_through_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        logo().image().save(&path).unwrap();

        let engine = RedactionEngine::from_path(&path, RedactOptions::default()).unwrap();
        assert_eq!(engine.template().image(), logo().image());
    }

    #[test]
    fn process_file_writes_redacted_page() {
        let engine = engine();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.png");
        let output = dir.path().join("out").join("page.png");
        stamped_page(&engine, 30, 25).save(&input).unwrap();

        let result = engine.process_file(&input, &output);
        assert!(result.success, "{}", result.message);
        assert_eq!((result.pages, result.matches), (1, 1));

        let saved = image::open(&output).unwrap().to_rgb8();
        assert!(saved.pixels().all(|p| *p == GRAY));
    }

    #[test]
    fn process_file_reports_unreadable_input() {
        let engine = engine();
        let dir = tempfile::tempdir().unwrap();
        let result = engine.process_file(&dir.path().join("absent.png"), &dir.path().join("o.png"));
        assert!(!result.success);
        assert!(result.message.starts_with("Failed to load"));
    }

    #[test]
    fn process_document_redacts_every_page() {
        let engine = engine();
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        for (i, (x, y)) in [(5, 5), (40, 30), (65, 0)].into_iter().enumerate() {
            stamped_page(&engine, x, y)
                .save(input.path().join(format!("page-{i}.png")))
                .unwrap();
        }
        std::fs::write(input.path().join("notes.txt"), "not a page").unwrap();

        let result = engine.process_document(input.path(), output.path());
        assert!(result.success, "{}", result.message);
        assert_eq!((result.pages, result.matches), (3, 3));

        let written = list_pages(output.path()).unwrap();
        assert_eq!(written.len(), 3);
        for path in written {
            let page = image::open(&path).unwrap().to_rgb8();
            assert!(page.pixels().all(|p| *p == GRAY), "{}", path.display());
        }
    }

    #[test]
    fn dry_run_writes_nothing() {
        let opts = RedactOptions {
            dry_run: true,
            ..RedactOptions::default()
        };
        let engine = RedactionEngine::new(logo(), opts).unwrap();
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        stamped_page(&engine, 10, 10)
            .save(input.path().join("a.png"))
            .unwrap();

        let result = engine.process_path(input.path(), output.path());
        assert!(result.success);
        assert_eq!(result.matches, 1);
        assert!(list_pages(output.path()).unwrap().is_empty());
    }

    #[test]
    fn broken_page_fails_the_whole_document() {
        let engine = engine();
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        stamped_page(&engine, 10, 10)
            .save(input.path().join("a.png"))
            .unwrap();
        std::fs::write(input.path().join("b.png"), b"definitely not a png").unwrap();

        let result = engine.process_document(input.path(), output.path());
        assert!(!result.success);
        assert!(result.message.contains("b.png"), "{}", result.message);
        assert!(list_pages(output.path()).unwrap().is_empty());
    }

    #[test]
    fn failed_document_keeps_existing_outputs() {
        let engine = engine();
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.png"] {
            stamped_page(&engine, 10, 10)
                .save(input.path().join(name))
                .unwrap();
        }
        let previous = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        previous.save(output.path().join("a.png")).unwrap();
        std::fs::create_dir(output.path().join("b.png")).unwrap();

        let result = engine.process_document(input.path(), output.path());
        assert!(!result.success);
        assert!(result.message.contains("b.png"), "{}", result.message);

        let kept = image::open(output.path().join("a.png")).unwrap().to_rgb8();
        assert_eq!(kept, previous);
        assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 2);
    }

    #[test]
    fn empty_directory_is_a_failure() {
        let engine = engine();
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let result = engine.process_document(input.path(), output.path());
        assert!(!result.success);
        assert_eq!(result.message, "No page images found");
    }
}
