// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::api::Channel;

/// Filter the channel list by a live search term.
///
/// Returns indices into the ORIGINAL unfiltered slice so that selection
/// keeps addressing the right channel after filtering. The match is a
/// case-insensitive substring test against the title or the group name;
/// a blank term matches everything.
pub fn filter_channels(channels: &[Channel], term: &str) -> Vec<usize> {
    let needle = term.trim().to_lowercase();

    channels
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            needle.is_empty()
                || c.title.to_lowercase().contains(&needle)
                || c.group
                    .as_deref()
                    .is_some_and(|g| g.to_lowercase().contains(&needle))
        })
        .map(|(idx, _)| idx)
        .collect()
}

/// Resolve a channel reference given on the command line: a numeric index
/// into the loaded list, or a case-insensitive title match.
pub fn resolve_channel<'a>(channels: &'a [Channel], reference: &str) -> Option<(usize, &'a Channel)> {
    if let Ok(index) = reference.parse::<usize>() {
        return channels.get(index).map(|c| (index, c));
    }

    let wanted = reference.to_lowercase();
    channels
        .iter()
        .enumerate()
        .find(|(_, c)| c.title.to_lowercase() == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(title: &str, group: Option<&str>) -> Channel {
        Channel {
            title: title.to_string(),
            url: format!("http://example.com/{}.m3u8", title.to_lowercase()),
            group: group.map(|g| g.to_string()),
            tvg_id: None,
            tvg_logo: None,
        }
    }

    fn sample() -> Vec<Channel> {
        vec![
            channel("News 24", Some("News")),
            channel("Sports One", Some("Sports")),
            channel("Movie Central", None),
            channel("Local News", Some("News")),
        ]
    }

    #[test]
    fn test_blank_term_matches_everything() {
        let channels = sample();
        assert_eq!(filter_channels(&channels, ""), vec![0, 1, 2, 3]);
        assert_eq!(filter_channels(&channels, "   "), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let channels = sample();
        assert_eq!(filter_channels(&channels, "NEWS"), vec![0, 3]);
        assert_eq!(filter_channels(&channels, "movie"), vec![2]);
    }

    #[test]
    fn test_group_name_matches_too() {
        let channels = sample();
        // "Sports One" matches on both title and group; dedup by index.
        assert_eq!(filter_channels(&channels, "sports"), vec![1]);
    }

    #[test]
    fn test_indices_are_original_not_filtered_positions() {
        let channels = sample();
        let filtered = filter_channels(&channels, "local");
        assert_eq!(filtered, vec![3]);
        assert_eq!(channels[filtered[0]].title, "Local News");
    }

    #[test]
    fn test_no_match_yields_empty_set() {
        let channels = sample();
        assert!(filter_channels(&channels, "documentary").is_empty());
    }

    #[test]
    fn test_resolve_by_index_and_title() {
        let channels = sample();
        assert_eq!(resolve_channel(&channels, "2").unwrap().0, 2);
        assert_eq!(resolve_channel(&channels, "local news").unwrap().0, 3);
        assert!(resolve_channel(&channels, "99").is_none());
        assert!(resolve_channel(&channels, "nope").is_none());
    }
}
