use crate::annotation::annotation::{Annotation, AnnotationTrack};

/// Fills invalid or missing annotations from previous frames.
///
/// Walks the track once, left to right. A frame whose annotation passes
/// `is_valid` is emitted as-is and becomes the carried value; an invalid
/// frame repeats the carried value while it is younger than `max_age`
/// frames, after which the output reverts to absent. `max_age == None`
/// carries forward without limit once anything validated.
///
/// The input is not modified; a fresh track is returned.
pub fn normalize_annotations<F>(
    track: &[(String, Option<Annotation>)],
    is_valid: F,
    max_age: Option<usize>,
) -> AnnotationTrack
where
    F: Fn(&Annotation) -> bool,
{
    let mut current: Option<Annotation> = None;
    let mut age: usize = 0;

    let mut normalized = Vec::with_capacity(track.len());
    for (id, annot) in track {
        match annot {
            Some(a) if is_valid(a) => {
                current = Some(a.clone());
                age = 0;
            }
            _ => {
                if max_age.map_or(true, |limit| age < limit) {
                    age += 1;
                } else {
                    // no detection and the carried value is too stale
                    current = None;
                }
            }
        }
        normalized.push((id.clone(), current.clone()));
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Option<Annotation> {
        Some(Annotation::new((0.0, 0.0), (64.0, 64.0)))
    }

    fn too_small() -> Option<Annotation> {
        Some(Annotation::new((0.0, 0.0), (8.0, 8.0)))
    }

    fn is_valid(annot: &Annotation) -> bool {
        annot.height() >= 32.0 && annot.width() >= 32.0
    }

    fn track(entries: Vec<Option<Annotation>>) -> AnnotationTrack {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, a)| (i.to_string(), a))
            .collect()
    }

    #[test]
    fn test_unbounded_carry_forward_never_reverts() {
        let mut entries = vec![valid()];
        entries.extend(std::iter::repeat_with(|| None).take(20));
        let out = normalize_annotations(&track(entries), is_valid, None);

        assert_eq!(out.len(), 21);
        for (id, annot) in &out {
            assert_eq!(annot.as_ref(), valid().as_ref(), "frame {id}");
        }
    }

    #[test]
    fn test_finite_max_age_reverts_after_window() {
        // valid, then 3 invalid frames with max_age=2: the first two carry
        // forward, the third reverts to absent.
        let entries = vec![valid(), None, None, None];
        let out = normalize_annotations(&track(entries), is_valid, Some(2));

        assert!(out[0].1.is_some());
        assert!(out[1].1.is_some());
        assert!(out[2].1.is_some());
        assert!(out[3].1.is_none());
    }

    #[test]
    fn test_valid_frame_resets_age() {
        let entries = vec![valid(), None, valid(), None, None];
        let out = normalize_annotations(&track(entries), is_valid, Some(2));
        // window restarts at frame 2, so frames 3 and 4 still carry
        assert!(out.iter().all(|(_, a)| a.is_some()));
    }

    #[test]
    fn test_invalid_annotations_are_replaced_not_kept() {
        let entries = vec![valid(), too_small()];
        let out = normalize_annotations(&track(entries), is_valid, None);
        assert_eq!(out[1].1, valid());
    }

    #[test]
    fn test_leading_invalid_frames_stay_absent() {
        let entries = vec![None, too_small(), valid()];
        let out = normalize_annotations(&track(entries), is_valid, None);
        assert!(out[0].1.is_none());
        assert!(out[1].1.is_none());
        assert!(out[2].1.is_some());
    }

    #[test]
    fn test_max_age_zero_never_carries() {
        let entries = vec![valid(), None, valid()];
        let out = normalize_annotations(&track(entries), is_valid, Some(0));
        assert!(out[0].1.is_some());
        assert!(out[1].1.is_none());
        assert!(out[2].1.is_some());
    }

    #[test]
    fn test_order_and_ids_are_preserved() {
        let entries = vec![valid(), None, valid()];
        let out = normalize_annotations(&track(entries), is_valid, None);
        let ids: Vec<&str> = out.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_empty_track() {
        let out = normalize_annotations(&[], is_valid, None);
        assert!(out.is_empty());
    }

    #[test]
    fn test_input_is_untouched() {
        let input = track(vec![valid(), None]);
        let snapshot = input.clone();
        let _ = normalize_annotations(&input, is_valid, None);
        assert_eq!(input, snapshot);
    }
}
