use crate::position::NavigationState;
use crate::spine::Spine;

/// Leaf file name of the chapter's spine href, e.g. `chapter2.xhtml` from
/// `OEBPS/text/chapter2.xhtml`. `None` for an out-of-range index or an href
/// with an empty leaf; the caller logs and leaves the name unset.
pub(crate) fn doc_name(spine: &Spine, chapter: usize) -> Option<String> {
    let href = &spine.get(chapter)?.href;
    let leaf = href.rsplit('/').next()?;
    if leaf.is_empty() {
        return None;
    }
    Some(leaf.to_string())
}

/// A chapter URL split into its spine-searchable path and optional fragment.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ChapterUrl<'a> {
    pub path: &'a str,
    pub fragment: Option<&'a str>,
}

/// Split `url` into `path#fragment` and strip any directory prefix from the
/// path, matching how hrefs are compared against the spine.
pub(crate) fn parse_url(url: &str) -> ChapterUrl<'_> {
    let (path, fragment) = match url.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (url, None),
    };
    let path = path.rsplit('/').next().unwrap_or(path);
    ChapterUrl { path, fragment }
}

/// Pure increment; bounds are enforced by the navigation controller.
pub(crate) fn advance(state: &mut NavigationState) -> usize {
    state.chapter += 1;
    state.chapter
}

/// Pure decrement; bounds are enforced by the navigation controller.
pub(crate) fn retreat(state: &mut NavigationState) -> usize {
    state.chapter = state.chapter.saturating_sub(1);
    state.chapter
}
