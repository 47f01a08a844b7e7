use scraper::{Html, Selector};

/// Read the total page count from a search listing.
///
/// The listing's pager links the final page as `<a href="...&page=N">Last</a>`.
/// Returns `None` when the listing has no pager (a single page of results).
///
/// # Examples
/// ```
/// use playdrone_archiver::parser::last_page;
///
/// let html = r#"<div class="pager"><a href="/search.php?query=x&page=2">2</a>
///               <a href="/search.php?query=x&page=17">Last</a></div>"#;
/// assert_eq!(last_page(html), Some(17));
/// ```
pub fn last_page(html_body: &str) -> Option<u32> {
    let document = Html::parse_document(html_body);
    let selector = Selector::parse("a[href]").expect("Invalid CSS selector");

    document
        .select(&selector)
        .find(|a| a.text().collect::<String>().trim() == "Last")
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| href.rsplit_once('='))
        .and_then(|(_, page)| page.trim().parse().ok())
}

/// Extract the result links (`a.titleLink`) of a search listing, in page order
pub fn title_links(html_body: &str) -> Vec<String> {
    let document = Html::parse_document(html_body);
    let selector = Selector::parse("a.titleLink[href]").expect("Invalid CSS selector");

    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect()
}

/// Count the file rows (`td.ttl`) listed on a snapshot detail page
pub fn count_listed_files(html_body: &str) -> usize {
    let document = Html::parse_document(html_body);
    let selector = Selector::parse("td.ttl").expect("Invalid CSS selector");
    document.select(&selector).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_page_found() {
        let html = r#"<html><body>
            <a href="/search.php?query=collection%3Aplaydrone-metadata&sort=-publicdate&page=2">2</a>
            <a href="/search.php?query=collection%3Aplaydrone-metadata&sort=-publicdate&page=43">Last</a>
            </body></html>"#;
        assert_eq!(last_page(html), Some(43));
    }

    #[test]
    fn test_last_page_missing() {
        let html = "<html><body><a href=\"/x?page=2\">Next</a></body></html>";
        assert_eq!(last_page(html), None);
    }

    #[test]
    fn test_last_page_not_numeric() {
        let html = "<html><body><a href=\"/x?page=\">Last</a></body></html>";
        assert_eq!(last_page(html), None);
    }

    #[test]
    fn test_title_links_only_matches_class() {
        let html = r#"<html><body>
            <a class="titleLink" href="/details/playdrone-metadata-2014-10-31-00">a</a>
            <a href="/details/unrelated">b</a>
            <a class="titleLink" href=" /details/playdrone-metadata-2014-10-30-01 ">c</a>
            <a class="titleLink">no href</a>
            </body></html>"#;
        assert_eq!(
            title_links(html),
            vec![
                "/details/playdrone-metadata-2014-10-31-00".to_string(),
                "/details/playdrone-metadata-2014-10-30-01".to_string(),
            ]
        );
    }

    #[test]
    fn test_count_listed_files() {
        let html = r#"<html><body><table>
            <tr><td class="ttl">a.json</td><td>1 KB</td></tr>
            <tr><td class="ttl">b.json</td><td>2 KB</td></tr>
            <tr><td class="other">c.json</td></tr>
            </table></body></html>"#;
        assert_eq!(count_listed_files(html), 2);
    }

    #[test]
    fn test_empty_html() {
        assert_eq!(last_page(""), None);
        assert!(title_links("").is_empty());
        assert_eq!(count_listed_files(""), 0);
    }
}
