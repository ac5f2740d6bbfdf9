use image::{GrayImage, Luma};
use vodcut_types::{LumaFrame, Rect};

use crate::{LocatorSettings, Template, TemplateLocator};

fn ring_template() -> Template {
    let image = GrayImage::from_fn(20, 16, |x, y| {
        let dx = x as f64 - 9.5;
        let dy = y as f64 - 7.5;
        let r = (dx * dx + dy * dy).sqrt();
        if (4.0..6.5).contains(&r) || (x + y) % 9 == 0 {
            Luma([230])
        } else {
            Luma([20])
        }
    });
    Template::from_image(image).unwrap()
}

fn frame_with(stamps: &[(u32, u32, &GrayImage)], width: u32, height: u32) -> LumaFrame {
    let mut canvas = GrayImage::from_fn(width, height, |x, y| Luma([(60 + (x / 8 + y / 8) % 3) as u8]));
    for (top, left, patch) in stamps {
        image::imageops::replace(&mut canvas, *patch, *left as i64, *top as i64);
    }
    LumaFrame::from_owned(width, height, width as usize, None, canvas.into_raw()).unwrap()
}

#[test]
fn locate_picks_the_stamped_scale() {
    let template = ring_template();
    let stamped = template.scaled(0.8).unwrap();
    let frames = vec![
        frame_with(&[(30, 40, &stamped)], 120, 90),
        frame_with(&[(31, 40, &stamped)], 120, 90),
    ];
    let locator = TemplateLocator::new(LocatorSettings {
        scales: vec![0.6, 0.8, 1.0],
        max_clusters: 1,
        worst_match: 0.6,
    });
    let located = locator.locate(&template, &frames, None).unwrap();
    assert_eq!(located.scale, Some(0.8));
    assert_eq!(located.locations.len(), 2);
    assert_eq!((located.locations[0].y, located.locations[0].x), (30.0, 40.0));
    assert_eq!((located.locations[1].y, located.locations[1].x), (31.0, 40.0));
    assert!(located.locations.iter().all(|l| l.confidence > 0.99));
}

#[test]
fn clusters_report_separate_occurrences() {
    let template = ring_template();
    let stamped = template.scaled(1.0).unwrap();
    let frames = vec![frame_with(&[(10, 10, &stamped), (50, 80, &stamped)], 140, 90)];
    let locator = TemplateLocator::new(LocatorSettings {
        scales: vec![1.0],
        max_clusters: 2,
        worst_match: 0.6,
    });
    let located = locator.locate(&template, &frames, None).unwrap();
    let mut found: Vec<_> = located.locations.iter().map(|l| (l.y, l.x)).collect();
    found.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(found, vec![(10.0, 10.0), (50.0, 80.0)]);
}

#[test]
fn roi_limits_the_search_and_keeps_absolute_coordinates() {
    let template = ring_template();
    let stamped = template.scaled(1.0).unwrap();
    let frames = vec![frame_with(&[(10, 10, &stamped), (50, 80, &stamped)], 140, 90)];
    let locator = TemplateLocator::new(LocatorSettings {
        scales: vec![1.0],
        max_clusters: 1,
        worst_match: 0.6,
    });
    let roi = Rect::new(40.0, 70.0, 40.0, 50.0);
    let located = locator.locate(&template, &frames, Some(roi)).unwrap();
    assert_eq!(located.locations.len(), 1);
    assert_eq!((located.locations[0].y, located.locations[0].x), (50.0, 80.0));
}

#[test]
fn nothing_above_floor_reports_no_scale() {
    let template = ring_template();
    let frames = vec![frame_with(&[], 100, 80)];
    let locator = TemplateLocator::new(LocatorSettings {
        scales: vec![0.9, 1.0],
        max_clusters: 2,
        worst_match: 0.6,
    });
    let located = locator.locate(&template, &frames, None).unwrap();
    assert!(!located.is_found());
    assert!(located.locations.is_empty());
}

#[test]
fn roi_smaller_than_template_reports_no_scale() {
    let template = ring_template();
    let stamped = template.scaled(1.0).unwrap();
    let frames = vec![frame_with(&[(10, 10, &stamped)], 100, 80)];
    let locator = TemplateLocator::new(LocatorSettings::default());
    let located = locator
        .locate(&template, &frames, Some(Rect::new(10.0, 10.0, 5.0, 5.0)))
        .unwrap();
    assert_eq!(located.scale, None);
}
