//! Page rendering with minijinja.
//!
//! Templates ship inside the binary; `server.templates_dir` may shadow any
//! of them by file name.

use std::path::PathBuf;

use minijinja::{path_loader, Environment};
use serde::Serialize;

use crate::error::WebResult;

const BUILTIN: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("explore.html", include_str!("../templates/explore.html")),
    ("result.html", include_str!("../templates/result.html")),
    ("upload_result.html", include_str!("../templates/upload_result.html")),
];

fn builtin_source(name: &str) -> Option<&'static str> {
    BUILTIN.iter().find(|(n, _)| *n == name).map(|(_, src)| *src)
}

pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        let mut env = Environment::new();
        match override_dir {
            Some(dir) => {
                let from_disk = path_loader(dir);
                env.set_loader(move |name| match from_disk(name)? {
                    Some(src) => Ok(Some(src)),
                    None => Ok(builtin_source(name).map(str::to_string)),
                });
            }
            None => env.set_loader(|name| Ok(builtin_source(name).map(str::to_string))),
        }
        Self { env }
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> WebResult<String> {
        let template = self.env.get_template(name)?;
        Ok(template.render(ctx)?)
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self::new(None)
    }
}
