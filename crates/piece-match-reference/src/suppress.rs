use piece_match_core::Contour;

/// Drop contours whose bbox lies mostly inside a larger kept bbox.
///
/// Contours are visited by bbox area, largest first; a contour is dropped
/// when at least `threshold` of its bbox is inside an already kept one. The
/// survivors come back largest first.
pub fn suppress_contained(mut contours: Vec<Contour>, threshold: f32) -> Vec<Contour> {
    contours.sort_by(|a, b| {
        b.bounding_rect()
            .area()
            .total_cmp(&a.bounding_rect().area())
    });
    let mut kept: Vec<Contour> = Vec::with_capacity(contours.len());
    for contour in contours {
        let bbox = contour.bounding_rect();
        let nested = kept
            .iter()
            .any(|k| bbox.containment_in(&k.bounding_rect()) >= threshold);
        if !nested {
            kept.push(contour);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use piece_match_core::testing::rect_contour;
    use piece_match_core::NormRect;

    #[test]
    fn nested_box_is_dropped() {
        let outer = rect_contour(NormRect::new(0.1, 0.1, 0.5, 0.5));
        let inner = rect_contour(NormRect::new(0.2, 0.2, 0.1, 0.1));
        let kept = suppress_contained(vec![inner, outer.clone()], 0.5);
        assert_eq!(kept, vec![outer]);
    }

    #[test]
    fn mostly_outside_box_survives() {
        let a = rect_contour(NormRect::new(0.0, 0.0, 0.4, 0.4));
        let b = rect_contour(NormRect::new(0.3, 0.3, 0.3, 0.3));
        let kept = suppress_contained(vec![a, b], 0.5);
        assert_eq!(kept.len(), 2);
    }
}
