//! Reference rewriting
//!
//! Redirects every reference to `old_path` inside one document to
//! `new_path`. Matching is by resolved path, so `img.png`, `./img.png` and
//! `/assets/img.png` are all caught when they point at the same file.
//! Running a rewrite twice is a no-op the second time: the links now resolve
//! to `new_path` and no longer match.

use crate::canvas::Canvas;
use crate::error::DocumentError;
use crate::index::LinkResolver;
use crate::links::{apply_edits, encode_target, parse_links, split_fragment, LinkKind, TextEdit};
use crate::paths;

/// How a link to a file in another folder is spelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathStyle {
    /// `/folder/file.ext`
    RootAbsolute,
    /// `folder/file.ext`
    VaultRelative,
}

/// Compute the new spelling of a link that pointed at `old_path`
///
/// When both files share a folder only the final segment is swapped, so the
/// author's own spelling (`./`, `../`, bare name) survives. The engine always
/// renames within a folder; the cross-folder branch serves callers of the
/// public rewrite functions that move a file elsewhere.
fn retarget_link(written: &str, old_path: &str, new_path: &str, style: PathStyle) -> String {
    let (path, fragment) = split_fragment(written);

    let new_written = if paths::parent(old_path) == paths::parent(new_path) {
        match path.rfind('/') {
            Some(idx) => format!("{}/{}", &path[..idx], paths::file_name(new_path)),
            None => paths::file_name(new_path).to_string(),
        }
    } else {
        match style {
            PathStyle::RootAbsolute => format!("/{}", new_path),
            PathStyle::VaultRelative => new_path.to_string(),
        }
    };

    format!("{}{}", new_written, fragment)
}

/// Text edits that redirect a prose document's references
///
/// Every link resolving to `old_path` gets its target rewritten. Display
/// text equal to the old link text is relabeled to the new link text;
/// empty or custom display text is kept as is.
pub fn prose_reference_edits<R>(
    text: &str,
    document_path: &str,
    old_path: &str,
    new_path: &str,
    resolver: &R,
) -> Vec<TextEdit>
where
    R: LinkResolver + ?Sized,
{
    let mut edits = Vec::new();

    for occ in parse_links(text) {
        let resolved = resolver.resolve_link_to_path(&occ.link, document_path);
        if resolved.as_deref() != Some(old_path) {
            continue;
        }

        let new_link = retarget_link(&occ.link, old_path, new_path, PathStyle::RootAbsolute);
        let in_angle_brackets = occ.kind != LinkKind::Wiki
            && occ.target_range.start > 0
            && text.as_bytes()[occ.target_range.start - 1] == b'<';

        edits.push(TextEdit {
            offset: occ.target_range.start,
            remove_len: occ.target_range.len(),
            insert_text: encode_target(occ.kind, in_angle_brackets, &new_link),
        });

        if let (Some(display), Some(range)) = (&occ.display_text, &occ.display_range) {
            if !display.is_empty() && occ.is_link_text(display) {
                // relabel in the same spelling the display used
                let label = if *display == occ.link {
                    new_link.clone()
                } else {
                    encode_target(occ.kind, in_angle_brackets, &new_link)
                };
                edits.push(TextEdit {
                    offset: range.start,
                    remove_len: range.len(),
                    insert_text: label,
                });
            }
        }
    }

    edits
}

/// Rewrite a prose document
///
/// Returns the updated text, or `None` when nothing pointed at `old_path`.
pub fn rewrite_prose_reference<R>(
    text: &str,
    document_path: &str,
    old_path: &str,
    new_path: &str,
    resolver: &R,
) -> Option<String>
where
    R: LinkResolver + ?Sized,
{
    let edits = prose_reference_edits(text, document_path, old_path, new_path, resolver);
    if edits.is_empty() {
        return None;
    }
    Some(apply_edits(text, &edits))
}

/// Rewrite a canvas document
///
/// File nodes whose `file` resolves to `old_path` are pointed at `new_path`;
/// everything else is preserved. Returns `Ok(None)` when no node matched.
pub fn rewrite_canvas_reference<R>(
    text: &str,
    document_path: &str,
    old_path: &str,
    new_path: &str,
    resolver: &R,
) -> Result<Option<String>, DocumentError>
where
    R: LinkResolver + ?Sized,
{
    let mut canvas = Canvas::parse(text)?;
    let changed = canvas.retarget(|file| {
        let resolved = resolver.resolve_link_to_path(file, document_path)?;
        (resolved == old_path)
            .then(|| retarget_link(file, old_path, new_path, PathStyle::VaultRelative))
    });

    if changed == 0 {
        return Ok(None);
    }
    canvas.to_json_string().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::VaultResolver;

    fn resolver(files: &[&str]) -> VaultResolver {
        VaultResolver::new(files.iter().map(|f| f.to_string()))
    }

    #[test]
    fn test_retarget_link_keeps_spelling_in_same_folder() {
        assert_eq!(
            retarget_link("../img/a.png", "img/a.png", "img/ff.png", PathStyle::RootAbsolute),
            "../img/ff.png"
        );
        assert_eq!(
            retarget_link("a.png#x", "a.png", "ff.png", PathStyle::RootAbsolute),
            "ff.png#x"
        );
        assert_eq!(
            retarget_link("a.png", "a.png", "other/ff.png", PathStyle::RootAbsolute),
            "/other/ff.png"
        );
        assert_eq!(
            retarget_link("a.png", "a.png", "other/ff.png", PathStyle::VaultRelative),
            "other/ff.png"
        );
    }

    #[test]
    fn test_embed_with_empty_display() {
        let r = resolver(&["img.png", "note.md"]);
        let out = rewrite_prose_reference("![](img.png)", "note.md", "img.png", "abc123.png", &r);
        assert_eq!(out.as_deref(), Some("![](abc123.png)"));
    }

    #[test]
    fn test_display_equal_to_link_is_relabeled() {
        let r = resolver(&["img.png"]);
        let out = rewrite_prose_reference(
            "[img.png](img.png) and [[img.png|img.png]]",
            "note.md",
            "img.png",
            "ff.png",
            &r,
        );
        assert_eq!(out.as_deref(), Some("[ff.png](ff.png) and [[ff.png|ff.png]]"));
    }

    #[test]
    fn test_encoded_display_is_relabeled() {
        let r = resolver(&["pics/my cat.png"]);
        let out = rewrite_prose_reference(
            "[pics/my%20cat.png](pics/my%20cat.png) [pics/my cat.png](pics/my%20cat.png)",
            "note.md",
            "pics/my cat.png",
            "pics/a b.png",
            &r,
        );
        assert_eq!(
            out.as_deref(),
            Some("[pics/a%20b.png](pics/a%20b.png) [pics/a b.png](pics/a%20b.png)")
        );
    }

    #[test]
    fn test_balanced_parentheses_target() {
        let r = resolver(&["img(1).png"]);
        let out = rewrite_prose_reference("![](img(1).png)", "n.md", "img(1).png", "ff.png", &r);
        assert_eq!(out.as_deref(), Some("![](ff.png)"));
    }

    #[test]
    fn test_custom_display_is_kept() {
        let r = resolver(&["img.png"]);
        let out = rewrite_prose_reference(
            "[My cat](img.png) ![[img.png|300]]",
            "note.md",
            "img.png",
            "ff.png",
            &r,
        );
        assert_eq!(out.as_deref(), Some("[My cat](ff.png) ![[ff.png|300]]"));
    }

    #[test]
    fn test_matching_is_by_resolved_path() {
        let r = resolver(&["notes/img.png", "img.png"]);
        let text = "![](img.png) ![](../img.png) ![](/img.png) [[img.png]]";
        // from notes/n.md, `img.png` and `[[img.png]]` are the neighbour file
        let out = rewrite_prose_reference(text, "notes/n.md", "img.png", "ff.png", &r);
        assert_eq!(
            out.as_deref(),
            Some("![](img.png) ![](../ff.png) ![](/ff.png) [[img.png]]")
        );
    }

    #[test]
    fn test_two_spellings_both_rewritten() {
        let r = resolver(&["assets/img.png"]);
        let text = "![](../assets/img.png)\n![[img.png]]";
        let out = rewrite_prose_reference(text, "notes/n.md", "assets/img.png", "assets/ff.png", &r);
        assert_eq!(out.as_deref(), Some("![](../assets/ff.png)\n![[ff.png]]"));
    }

    #[test]
    fn test_other_links_untouched() {
        let r = resolver(&["a.png", "b.png"]);
        let text = "# Title\n![](a.png) text ![](b.png) [site](https://a.png)\n";
        let out = rewrite_prose_reference(text, "n.md", "a.png", "ff.png", &r);
        assert_eq!(
            out.as_deref(),
            Some("# Title\n![](ff.png) text ![](b.png) [site](https://a.png)\n")
        );
    }

    #[test]
    fn test_fragment_and_title_preserved() {
        let r = resolver(&["doc.pdf"]);
        let text = r#"[doc](doc.pdf#page=2 "The doc") ![[doc.pdf#page=3]]"#;
        let out = rewrite_prose_reference(text, "n.md", "doc.pdf", "77aa.pdf", &r);
        assert_eq!(
            out.as_deref(),
            Some(r#"[doc](77aa.pdf#page=2 "The doc") ![[77aa.pdf#page=3]]"#)
        );
    }

    #[test]
    fn test_encoded_and_angle_targets() {
        let r = resolver(&["my pics/cat one.png"]);
        let text = "![](my%20pics/cat%20one.png) ![](<my pics/cat one.png>)";
        let out = rewrite_prose_reference(text, "n.md", "my pics/cat one.png", "my pics/ff.png", &r);
        assert_eq!(
            out.as_deref(),
            Some("![](my%20pics/ff.png) ![](<my pics/ff.png>)")
        );
    }

    #[test]
    fn test_reference_definition() {
        let r = resolver(&["logo.svg"]);
        let text = "![logo][l]\n\n[l]: logo.svg";
        let out = rewrite_prose_reference(text, "n.md", "logo.svg", "ee.svg", &r);
        assert_eq!(out.as_deref(), Some("![logo][l]\n\n[l]: ee.svg"));
    }

    #[test]
    fn test_prose_rewrite_is_idempotent() {
        let mut r = resolver(&["img.png"]);
        let first = rewrite_prose_reference("![](img.png)", "n.md", "img.png", "ff.png", &r).unwrap();
        r.remove("img.png");
        r.add("ff.png");
        assert_eq!(
            rewrite_prose_reference(&first, "n.md", "img.png", "ff.png", &r),
            None
        );
    }

    #[test]
    fn test_no_match_returns_none() {
        let r = resolver(&["img.png"]);
        assert_eq!(
            rewrite_prose_reference("no links", "n.md", "img.png", "ff.png", &r),
            None
        );
    }

    #[test]
    fn test_edits_report_offsets() {
        let r = resolver(&["img.png"]);
        let edits = prose_reference_edits("x ![](img.png)", "n.md", "img.png", "ff.png", &r);
        assert_eq!(
            edits,
            vec![TextEdit {
                offset: 6,
                remove_len: 7,
                insert_text: "ff.png".to_string()
            }]
        );
    }

    #[test]
    fn test_canvas_rewrite() {
        let r = resolver(&["diagram.pdf", "boards/b.canvas"]);
        let text = r#"{"nodes":[{"id":"n1","type":"file","file":"diagram.pdf","x":1,"color":"2"},{"id":"n2","type":"text","text":"diagram.pdf"}],"edges":[]}"#;
        let out = rewrite_canvas_reference(text, "boards/b.canvas", "diagram.pdf", "77aa.pdf", &r)
            .unwrap()
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["nodes"][0]["file"], "77aa.pdf");
        assert_eq!(value["nodes"][0]["x"], 1);
        assert_eq!(value["nodes"][0]["color"], "2");
        assert_eq!(value["nodes"][1]["text"], "diagram.pdf");
    }

    #[test]
    fn test_canvas_no_match_and_malformed() {
        let r = resolver(&["diagram.pdf"]);
        let text = r#"{"nodes":[{"id":"n1","type":"file","file":"other.pdf"}]}"#;
        assert!(rewrite_canvas_reference(text, "b.canvas", "diagram.pdf", "ff.pdf", &r)
            .unwrap()
            .is_none());
        assert!(matches!(
            rewrite_canvas_reference("[", "b.canvas", "diagram.pdf", "ff.pdf", &r),
            Err(DocumentError::InvalidJson(_))
        ));
    }
}
