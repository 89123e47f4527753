//! Article extraction from source pages
//!
//! A source page is a list of article cards. Each card yields a title and a
//! detail link; cards missing either are skipped.

use crate::config::SelectorConfig;
use crate::url::resolve_detail_url;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use thiserror::Error;

/// Errors that can occur while extracting articles
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// An article found on a source page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub title: String,
    /// Absolute URL of the article
    pub detail_url: String,
}

impl fmt::Display for ExtractedArticle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Article(title={}, url={})", self.title, self.detail_url)
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Extracts article cards from a source page
///
/// # Extraction Rules
///
/// - Every element matching `selectors.article` is one card.
/// - The title is the text of the first `selectors.title` match inside the
///   card, with runs of whitespace collapsed to single spaces.
/// - The detail link is the `href` of the first `selectors.detail` match
///   inside the card, resolved with [`resolve_detail_url`].
/// - Cards with an empty title, a missing/empty link, or a link that cannot
///   be resolved are skipped.
///
/// # Example
///
/// ```
/// use feedrelay::config::SelectorConfig;
/// use feedrelay::crawler::extract_articles;
///
/// let html = r#"<ul><li><a href="/p/1">First post</a></li></ul>"#;
/// let selectors = SelectorConfig {
///     article: "li".to_string(),
///     title: "a".to_string(),
///     detail: "a".to_string(),
/// };
/// let articles = extract_articles(html, "https://x.com/", &selectors).unwrap();
/// assert_eq!(articles[0].detail_url, "https://x.com/p/1");
/// ```
pub fn extract_articles(
    html: &str,
    source_url: &str,
    selectors: &SelectorConfig,
) -> Result<Vec<ExtractedArticle>, ExtractError> {
    let card_selector = parse_selector(&selectors.article)?;
    let title_selector = parse_selector(&selectors.title)?;
    let detail_selector = parse_selector(&selectors.detail)?;

    let document = Html::parse_document(html);
    let mut articles = Vec::new();

    for (index, card) in document.select(&card_selector).enumerate() {
        let title = card
            .select(&title_selector)
            .next()
            .map(|element| collapse_whitespace(&element_text(element)))
            .unwrap_or_default();

        if title.is_empty() {
            tracing::debug!("{} card {} skipped: empty title", source_url, index);
            continue;
        }

        let href = card
            .select(&detail_selector)
            .next()
            .and_then(|element| element.value().attr("href"))
            .map(str::trim)
            .unwrap_or_default();

        if href.is_empty() {
            tracing::debug!("{} card {} skipped: empty detail url", source_url, index);
            continue;
        }

        let detail_url = match resolve_detail_url(source_url, href) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("{} card {} skipped: {}", source_url, index, e);
                continue;
            }
        };

        let article = ExtractedArticle { title, detail_url };
        tracing::trace!("{} parsed {}", source_url, article);
        articles.push(article);
    }

    Ok(articles)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Trims and folds every run of whitespace into one space
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selectors(article: &str, title: &str, detail: &str) -> SelectorConfig {
        SelectorConfig {
            article: article.to_string(),
            title: title.to_string(),
            detail: detail.to_string(),
        }
    }

    #[test]
    fn test_table_of_contents_page() {
        let html = r#"<html>
  <body>
    <a class="rss" href="/feed.atom">RSS</a>
    <div class="main">
    <ul class="toc">
      <li class="toc-head"><b>Table of Contents</b> (favorites in bold)</li>
      <li><a href="testing" class="">Go Testing By Example</a> <span class="toc-when">December 2023</span>
        <div class="toc-summary">
        The importance of testing, and twenty tips for writing good tests.
        </div>
      </li>
      <li><a href="acmscored" class="">Open Source Supply Chain Security at Google</a> <span class="toc-when">November 2023</span>
        <div class="toc-summary">
        A remote talk at ACM SCORED 2023
        </div>
      </li>
    </ul>
    </div>
  </body>
</html>"#;

        let articles = extract_articles(
            html,
            "https://research.swtch.com/",
            &selectors("ul.toc li", "a", "a"),
        )
        .unwrap();

        assert_eq!(
            articles,
            vec![
                ExtractedArticle {
                    title: "Go Testing By Example".to_string(),
                    detail_url: "https://research.swtch.com/testing".to_string(),
                },
                ExtractedArticle {
                    title: "Open Source Supply Chain Security at Google".to_string(),
                    detail_url: "https://research.swtch.com/acmscored".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_title_whitespace_is_collapsed() {
        let html = r#"<div class="card"><h2>
            Breaking
               news   today
        </h2><a href="https://x.com/a">more</a></div>"#;

        let articles =
            extract_articles(html, "https://x.com/", &selectors(".card", "h2", "a")).unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Breaking news today");
        assert_eq!(articles[0].detail_url, "https://x.com/a");
    }

    #[test]
    fn test_card_without_link_is_skipped() {
        let html = r#"
            <article><h2>No link</h2></article>
            <article><h2>Empty link</h2><a href="  ">x</a></article>
            <article><h2>Good</h2><a href="/good">x</a></article>
        "#;

        let articles =
            extract_articles(html, "https://x.com/", &selectors("article", "h2", "a")).unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].detail_url, "https://x.com/good");
    }

    #[test]
    fn test_non_http_links_are_skipped() {
        let html = r#"
            <article><h2>Share</h2><a href="javascript:share()">x</a></article>
            <article><h2>Contact</h2><a href="mailto:desk@x.com">x</a></article>
            <article><h2>Mirror</h2><a href="//cdn.other.org/p">x</a></article>
        "#;

        let articles =
            extract_articles(html, "https://x.com/news", &selectors("article", "h2", "a"))
                .unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Mirror");
        assert_eq!(articles[0].detail_url, "https://cdn.other.org/p");
    }

    #[test]
    fn test_no_cards_is_not_an_error() {
        let articles = extract_articles(
            "<html><body></body></html>",
            "https://x.com/",
            &selectors("article", "h2", "a"),
        )
        .unwrap();
        assert!(articles.is_empty());
    }

    #[test]
    fn test_invalid_selector() {
        let result = extract_articles("<p></p>", "https://x.com/", &selectors("a[", "h2", "a"));
        assert!(matches!(
            result,
            Err(ExtractError::InvalidSelector { selector, .. }) if selector == "a["
        ));
    }
}
