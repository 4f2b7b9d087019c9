//! Self-contained HTML report made of titled sections holding text and
//! plotly figures.
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::Plot;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.12.1.min.js";

enum Block {
    Content(Markup),
    Plot(Plot),
}

pub struct ReportSection {
    title: String,
    blocks: Vec<Block>,
}

impl ReportSection {
    pub fn new(title: &str) -> Self {
        ReportSection {
            title: title.to_string(),
            blocks: Vec::new(),
        }
    }

    pub fn add_content(&mut self, content: Markup) {
        self.blocks.push(Block::Content(content));
    }

    pub fn add_plot(&mut self, plot: Plot) {
        self.blocks.push(Block::Plot(plot));
    }
}

pub struct Report {
    title: String,
    version: String,
    sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(title: &str, version: &str) -> Self {
        Report {
            title: title.to_string(),
            version: version.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn render(&self) -> Markup {
        html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="utf-8";
                    title { (self.title) }
                    script src=(PLOTLY_CDN) {}
                }
                body {
                    h1 { (self.title) }
                    p { "glucast " (self.version) }
                    @for (s_idx, sec) in self.sections.iter().enumerate() {
                        section {
                            h2 { (sec.title) }
                            @for (b_idx, block) in sec.blocks.iter().enumerate() {
                                @match block {
                                    Block::Content(markup) => { div { (markup) } }
                                    Block::Plot(plot) => {
                                        @let div_id = format!("plot-{}-{}", s_idx, b_idx);
                                        (PreEscaped(plot.to_inline_html(Some(&div_id))))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.render().into_string())
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        log::info!("Report saved to {}", path.display());
        Ok(())
    }
}
