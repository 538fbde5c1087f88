use folio_atoms::media::GalleryItem;

/// Take the element at `from` and reinsert it at `to`. Everything in between
/// shifts by one slot toward the vacated index.
pub fn move_to<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from == to {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

/// Rewrite positions to `0..n-1` following list order.
/// Returns the ids whose position changed, in list order.
pub fn renumber(items: &mut [GalleryItem]) -> Vec<String> {
    let mut changed = Vec::new();
    for (index, item) in items.iter_mut().enumerate() {
        let position = index as u32;
        if item.position != position {
            item.position = position;
            changed.push(item.image_id.clone());
        }
    }
    changed
}

/// True when positions are exactly `0..n-1` in list order
pub fn is_contiguous(items: &[GalleryItem]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(index, item)| item.position as usize == index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(ids: &[&str]) -> Vec<GalleryItem> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| GalleryItem {
                image_id: id.to_string(),
                project_id: "p1".to_string(),
                locator: format!("projects/p1/{}.jpg", id),
                label: String::new(),
                position: i as u32,
                uploaded_at: String::new(),
            })
            .collect()
    }

    fn ids(items: &[GalleryItem]) -> Vec<&str> {
        items.iter().map(|i| i.image_id.as_str()).collect()
    }

    #[test]
    fn moving_backward_shifts_intervening_items_forward() {
        let mut list = items(&["a", "b", "c", "d"]);
        move_to(&mut list, 3, 1);
        assert_eq!(ids(&list), ["a", "d", "b", "c"]);
        assert_eq!(renumber(&mut list), ["d", "b", "c"]);
        assert!(is_contiguous(&list));
    }

    #[test]
    fn moving_forward_shifts_intervening_items_backward() {
        let mut list = items(&["a", "b", "c", "d"]);
        move_to(&mut list, 0, 2);
        assert_eq!(ids(&list), ["b", "c", "a", "d"]);
        assert_eq!(renumber(&mut list), ["b", "c", "a"]);
    }

    #[test]
    fn renumber_after_removal_skips_unchanged_prefix() {
        let mut list = items(&["a", "b", "c", "d"]);
        list.remove(1);
        assert!(!is_contiguous(&list));
        assert_eq!(renumber(&mut list), ["c", "d"]);
        assert!(is_contiguous(&list));
    }
}
