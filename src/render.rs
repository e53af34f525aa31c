//! HTML page rendering.
//!
//! Two pages are produced from one [`BuildContext`]:
//!
//! - **Index page** (`index.html`): latest episodes, year navigation, and
//!   every episode grouped by year.
//! - **Year pages** (`<year>.html`): the episodes of a single year.
//!
//! Each page comes either from a configured [upon] template or, when none is
//! configured, from the builtin [maud] markup below. Both see the same
//! context; templates receive it serialized with these keys:
//!
//! | key | contents |
//! |---|---|
//! | `top3` | up to three most recent episodes |
//! | `siteGenerationDate` | generation timestamp |
//! | `years` | rollups, year descending: `year`, `podcasts`, `active` (`"active"`/`""`), `isActive` |
//! | `currentYear` | calendar year at generation time |
//! | `year` | (year pages only) the rollup being rendered |
//!
//! Episodes expose `id`, `uid`, `title`, `publishDate`, `descriptionHtml`,
//! `photoPath`, `episodePhotoUri`, `dateAndTime`. Template output is
//! HTML-escaped by default; `descriptionHtml` is already HTML and should be
//! written with the `raw` formatter: `{{ podcast.descriptionHtml | raw }}`.

use crate::config::TemplatesConfig;
use crate::types::{PodcastRecord, YearRollup};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use upon::{Engine, Template, Value};

/// File name of the rendered index page.
pub const INDEX_FILENAME: &str = "index.html";

const SITE_TITLE: &str = "A Bootiful Podcast";
const STYLESHEET: &str = "assets/css/site.css";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: upon::Error,
    },
    #[error("rendering {page}: {source}")]
    Render {
        page: String,
        #[source]
        source: upon::Error,
    },
}

/// One rollup as seen by templates.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupView<'a> {
    pub year: i32,
    pub podcasts: &'a [PodcastRecord],
    pub active: &'static str,
    pub is_active: bool,
}

impl<'a> From<&'a YearRollup> for RollupView<'a> {
    fn from(rollup: &'a YearRollup) -> Self {
        Self {
            year: rollup.year,
            podcasts: &rollup.podcasts,
            active: rollup.active_class(),
            is_active: rollup.is_active,
        }
    }
}

/// Everything the index page template sees.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildContext<'a> {
    pub top3: &'a [PodcastRecord],
    pub site_generation_date: String,
    pub years: Vec<RollupView<'a>>,
    pub current_year: i32,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        top3: &'a [PodcastRecord],
        rollups: &'a [YearRollup],
        site_generation_date: String,
        current_year: i32,
    ) -> Self {
        Self {
            top3,
            site_generation_date,
            years: rollups.iter().map(RollupView::from).collect(),
            current_year,
        }
    }
}

/// Context for a single year page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct YearContext<'a, 'b> {
    year: &'b RollupView<'a>,
    years: &'b [RollupView<'a>],
    site_generation_date: &'b str,
    current_year: i32,
}

/// Paths written by [`PageRenderer::write_pages`].
#[derive(Debug, Default, Clone)]
pub struct RenderedPages {
    pub index: PathBuf,
    pub years: Vec<PathBuf>,
}

/// Renders the site's pages, from templates where configured.
pub struct PageRenderer {
    engine: Engine<'static>,
    chrome: Option<Template<'static>>,
    year: Option<Template<'static>>,
}

impl PageRenderer {
    /// Renderer using only the builtin pages.
    pub fn builtin() -> Self {
        Self {
            engine: new_engine(),
            chrome: None,
            year: None,
        }
    }

    /// Load and compile the configured templates. An empty path counts as
    /// not configured.
    ///
    /// Compilation happens here so a broken template fails before any page
    /// is rendered.
    pub fn from_config(templates: &TemplatesConfig) -> Result<Self, RenderError> {
        let engine = new_engine();
        let chrome = templates
            .page_chrome
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
            .map(|path| compile(&engine, path))
            .transpose()?;
        let year = templates
            .year
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
            .map(|path| compile(&engine, path))
            .transpose()?;
        Ok(Self {
            engine,
            chrome,
            year,
        })
    }

    pub fn render_index(&self, ctx: &BuildContext<'_>) -> Result<String, RenderError> {
        match &self.chrome {
            Some(template) => template
                .render(&self.engine, ctx)
                .to_string()
                .map_err(|source| RenderError::Render {
                    page: INDEX_FILENAME.to_string(),
                    source,
                }),
            None => Ok(render_builtin_index(ctx).into_string()),
        }
    }

    pub fn render_year(
        &self,
        ctx: &BuildContext<'_>,
        rollup: &RollupView<'_>,
    ) -> Result<String, RenderError> {
        match &self.year {
            Some(template) => {
                let year_ctx = YearContext {
                    year: rollup,
                    years: &ctx.years,
                    site_generation_date: &ctx.site_generation_date,
                    current_year: ctx.current_year,
                };
                template
                    .render(&self.engine, &year_ctx)
                    .to_string()
                    .map_err(|source| RenderError::Render {
                        page: year_filename(rollup.year),
                        source,
                    })
            }
            None => Ok(render_builtin_year(ctx, rollup).into_string()),
        }
    }

    /// Render the index and every year page into `dir`.
    pub fn write_pages(
        &self,
        ctx: &BuildContext<'_>,
        dir: &Path,
    ) -> Result<RenderedPages, RenderError> {
        let index = dir.join(INDEX_FILENAME);
        fs::write(&index, self.render_index(ctx)?)?;
        tracing::info!(path = %index.display(), "wrote index page");

        let mut years = Vec::with_capacity(ctx.years.len());
        for rollup in &ctx.years {
            let path = dir.join(year_filename(rollup.year));
            fs::write(&path, self.render_year(ctx, rollup)?)?;
            tracing::debug!(path = %path.display(), "wrote year page");
            years.push(path);
        }
        Ok(RenderedPages { index, years })
    }
}

/// File name of the page for `year`.
pub fn year_filename(year: i32) -> String {
    format!("{year}.html")
}

/// Engine with HTML-escaping output and a `raw` formatter for trusted HTML.
fn new_engine() -> Engine<'static> {
    let mut engine = Engine::new();
    engine.set_default_formatter(&escape_html);
    engine.add_formatter("raw", raw_formatter);
    engine
}

/// Escapes `& < > " '` in strings; other values format as usual.
fn escape_html(f: &mut upon::fmt::Formatter<'_>, value: &Value) -> upon::fmt::Result {
    match value {
        Value::String(s) => {
            for c in s.chars() {
                match c {
                    '&' => f.write_str("&amp;")?,
                    '<' => f.write_str("&lt;")?,
                    '>' => f.write_str("&gt;")?,
                    '"' => f.write_str("&quot;")?,
                    '\'' => f.write_str("&#x27;")?,
                    c => f.write_char(c)?,
                }
            }
        }
        v => upon::fmt::default(f, v)?,
    }
    Ok(())
}

/// Writes strings unescaped; other values format as usual.
fn raw_formatter(f: &mut upon::fmt::Formatter<'_>, value: &Value) -> upon::fmt::Result {
    match value {
        Value::String(s) => f.write_str(s)?,
        v => upon::fmt::default(f, v)?,
    }
    Ok(())
}

fn compile(engine: &Engine<'static>, path: &Path) -> Result<Template<'static>, RenderError> {
    let source = fs::read_to_string(path)?;
    engine
        .compile(source)
        .map_err(|source| RenderError::Template {
            path: path.to_path_buf(),
            source,
        })
}

// ============================================================================
// Builtin pages
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                link rel="stylesheet" href=(STYLESHEET);
            }
            body {
                (content)
            }
        }
    }
}

/// Year navigation; the active year carries the `active` class.
fn year_nav(years: &[RollupView<'_>]) -> Markup {
    html! {
        nav.years {
            ul {
                @for rollup in years {
                    li class=[rollup.is_active.then_some("active")] {
                        a href=(year_filename(rollup.year)) { (rollup.year) }
                    }
                }
            }
        }
    }
}

fn episode_card(podcast: &PodcastRecord) -> Markup {
    html! {
        article.episode id=(podcast.uid) {
            img.episode-photo src=(podcast.photo_path) alt=(podcast.title) loading="lazy";
            div.episode-body {
                h3.episode-title { (podcast.title) }
                time.episode-date datetime=(podcast.publish_date.to_rfc3339()) {
                    (podcast.date_and_time)
                }
                div.episode-description {
                    (PreEscaped(&podcast.description_html))
                }
            }
        }
    }
}

fn footer(ctx: &BuildContext<'_>) -> Markup {
    html! {
        footer.site-footer {
            p { "© " (ctx.current_year) " " (SITE_TITLE) }
            p.generated { "Generated " (ctx.site_generation_date) }
        }
    }
}

fn render_builtin_index(ctx: &BuildContext<'_>) -> Markup {
    let content = html! {
        header.site-header {
            h1 { (SITE_TITLE) }
            (year_nav(&ctx.years))
        }
        main.index-page {
            @if !ctx.top3.is_empty() {
                section.latest {
                    h2 { "Latest episodes" }
                    @for podcast in ctx.top3 {
                        (episode_card(podcast))
                    }
                }
            }
            @for rollup in &ctx.years {
                @let class = if rollup.is_active { "year active" } else { "year" };
                section class=(class) id={ "year-" (rollup.year) } {
                    h2 { (rollup.year) }
                    @for podcast in rollup.podcasts {
                        (episode_card(podcast))
                    }
                }
            }
        }
        (footer(ctx))
    };
    base_document(SITE_TITLE, content)
}

fn render_builtin_year(ctx: &BuildContext<'_>, rollup: &RollupView<'_>) -> Markup {
    let title = format!("{} · {}", SITE_TITLE, rollup.year);
    let content = html! {
        header.site-header {
            h1 { a href=(INDEX_FILENAME) { (SITE_TITLE) } }
            (year_nav(&ctx.years))
        }
        main.year-page {
            h2 { (rollup.year) }
            @for podcast in rollup.podcasts {
                (episode_card(podcast))
            }
        }
        (footer(ctx))
    };
    base_document(&title, content)
}
