// src/transform/concat.rs

use std::path::PathBuf;

use crate::errors::{Result, SitepipeError};
use crate::exec::plan::SourceFile;
use crate::transform::{RenderContext, RenderFuture, Transform};

/// Joins all inputs, in plan order, into one file in the task's `dest`.
#[derive(Debug, Clone)]
pub struct ConcatTransform {
    output: String,
    separator: String,
}

impl ConcatTransform {
    pub fn new(output: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            separator: separator.into(),
        }
    }
}

impl Transform for ConcatTransform {
    fn render<'a>(&'a self, ctx: &'a RenderContext, inputs: &'a [SourceFile]) -> RenderFuture<'a> {
        let ctx = ctx.clone();
        let inputs = inputs.to_vec();
        let this = self.clone();

        Box::pin(async move {
            tokio::task::spawn_blocking(move || this.concat(&ctx, &inputs))
                .await
                .map_err(|e| SitepipeError::Other(e.into()))?
        })
    }
}

impl ConcatTransform {
    fn concat(&self, ctx: &RenderContext, inputs: &[SourceFile]) -> Result<Vec<PathBuf>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let mut body: Vec<u8> = Vec::new();
        for (i, input) in inputs.iter().enumerate() {
            if i > 0 {
                body.extend_from_slice(self.separator.as_bytes());
            }
            let bytes = ctx.fs.read(&input.path).map_err(SitepipeError::FileSystem)?;
            body.extend_from_slice(&bytes);
        }

        let target = ctx.out_dir.join(&self.output);
        ctx.fs
            .write(&target, &body)
            .map_err(SitepipeError::FileSystem)?;
        Ok(vec![target])
    }
}
