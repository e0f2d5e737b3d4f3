//! Store configuration.
//!
//! Both store kinds take a builder-style configuration whose unset parts are
//! filled in exactly once when the store is created: no validator means
//! accept-all, no modifier means identity, no codec means [`JsonCodec`], no
//! backend means the process-wide [`ambient`] backend.

use std::fmt;
use std::sync::Arc;

use kvp_backend::{ambient, Backend};
use kvp_codec::{Codec, JsonCodec};
use kvp_pipeline::{Action, Pipeline, Validity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_codec() -> Arc<dyn Codec> {
    Arc::new(JsonCodec::new())
}

fn default_backend() -> Arc<dyn Backend> {
    ambient()
}

// ---------------------------------------------------------------------------
// StoreOptions
// ---------------------------------------------------------------------------

/// The plain flags of a store configuration, loadable from TOML or JSON.
///
/// Unset flags leave the configuration they are applied to unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    pub check_gets: Option<bool>,
    pub check_defaults: Option<bool>,
    /// Only meaningful for whole-object stores.
    pub partial: Option<bool>,
    /// Only meaningful for per-field stores.
    pub id: Option<String>,
}

// ---------------------------------------------------------------------------
// ObjectConfig
// ---------------------------------------------------------------------------

/// Configuration for an [`ObjectStore`](crate::ObjectStore).
#[derive(Clone)]
pub struct ObjectConfig {
    /// Re-read and re-validate the backend on every field read.
    pub check_gets: bool,
    /// Seed or read the backend when the store is created.
    pub check_defaults: bool,
    /// Share the backend key with other stores, each owning the fields
    /// named in its own defaults.
    pub partial: bool,
    pub pipeline: Pipeline,
    pub codec: Option<Arc<dyn Codec>>,
    pub backend: Option<Arc<dyn Backend>>,
}

impl Default for ObjectConfig {
    fn default() -> Self {
        Self {
            check_gets: true,
            check_defaults: true,
            partial: false,
            pipeline: Pipeline::new(),
            codec: None,
            backend: None,
        }
    }
}

impl ObjectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check_gets(mut self, check_gets: bool) -> Self {
        self.check_gets = check_gets;
        self
    }

    pub fn with_check_defaults(mut self, check_defaults: bool) -> Self {
        self.check_defaults = check_defaults;
        self
    }

    pub fn with_partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    /// Install the validator. The field-key argument is always `None`.
    pub fn with_validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&Value, Action, Option<&str>) -> Validity + Send + Sync + 'static,
    {
        self.pipeline = self.pipeline.with_validate(validate);
        self
    }

    /// Install the modifier. The field-key argument is always `None`.
    pub fn with_modify<F>(mut self, modify: F) -> Self
    where
        F: Fn(Value, Action, Option<&str>) -> Value + Send + Sync + 'static,
    {
        self.pipeline = self.pipeline.with_modify(modify);
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Apply the flags set in `options`. `id` is ignored.
    pub fn with_options(mut self, options: &StoreOptions) -> Self {
        if let Some(v) = options.check_gets {
            self.check_gets = v;
        }
        if let Some(v) = options.check_defaults {
            self.check_defaults = v;
        }
        if let Some(v) = options.partial {
            self.partial = v;
        }
        self
    }

    pub(crate) fn resolve(self) -> ResolvedObjectConfig {
        ResolvedObjectConfig {
            check_gets: self.check_gets,
            check_defaults: self.check_defaults,
            partial: self.partial,
            pipeline: self.pipeline,
            codec: self.codec.unwrap_or_else(default_codec),
            backend: self.backend.unwrap_or_else(default_backend),
        }
    }
}

impl fmt::Debug for ObjectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectConfig")
            .field("check_gets", &self.check_gets)
            .field("check_defaults", &self.check_defaults)
            .field("partial", &self.partial)
            .field("pipeline", &self.pipeline)
            .field("codec", &self.codec.as_ref().map(|_| "<codec>"))
            .field("backend", &self.backend.as_ref().map(|_| "<backend>"))
            .finish()
    }
}

/// An [`ObjectConfig`] with every default filled in.
pub(crate) struct ResolvedObjectConfig {
    pub check_gets: bool,
    pub check_defaults: bool,
    pub partial: bool,
    pub pipeline: Pipeline,
    pub codec: Arc<dyn Codec>,
    pub backend: Arc<dyn Backend>,
}

// ---------------------------------------------------------------------------
// SeparateConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`SeparateStore`](crate::SeparateStore).
#[derive(Clone)]
pub struct SeparateConfig {
    /// Prefix for every backend key: field `foo` with id `ns` lives at `ns.foo`.
    pub id: Option<String>,
    /// Re-read and re-validate the field's backend entry on every read.
    pub check_gets: bool,
    /// Seed or read each field's backend entry when the store is created.
    pub check_defaults: bool,
    pub pipeline: Pipeline,
    pub codec: Option<Arc<dyn Codec>>,
    pub backend: Option<Arc<dyn Backend>>,
}

impl Default for SeparateConfig {
    fn default() -> Self {
        Self {
            id: None,
            check_gets: true,
            check_defaults: true,
            pipeline: Pipeline::new(),
            codec: None,
            backend: None,
        }
    }
}

impl SeparateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_check_gets(mut self, check_gets: bool) -> Self {
        self.check_gets = check_gets;
        self
    }

    pub fn with_check_defaults(mut self, check_defaults: bool) -> Self {
        self.check_defaults = check_defaults;
        self
    }

    /// Install the validator. It sees a one-field object and the field name.
    pub fn with_validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&Value, Action, Option<&str>) -> Validity + Send + Sync + 'static,
    {
        self.pipeline = self.pipeline.with_validate(validate);
        self
    }

    /// Install the modifier. It sees a one-field object and the field name.
    pub fn with_modify<F>(mut self, modify: F) -> Self
    where
        F: Fn(Value, Action, Option<&str>) -> Value + Send + Sync + 'static,
    {
        self.pipeline = self.pipeline.with_modify(modify);
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Apply the flags set in `options`. `partial` is ignored.
    pub fn with_options(mut self, options: &StoreOptions) -> Self {
        if let Some(id) = &options.id {
            self.id = Some(id.clone());
        }
        if let Some(v) = options.check_gets {
            self.check_gets = v;
        }
        if let Some(v) = options.check_defaults {
            self.check_defaults = v;
        }
        self
    }

    /// The configured codec, or the default one.
    pub fn codec_or_default(&self) -> Arc<dyn Codec> {
        self.codec.clone().unwrap_or_else(default_codec)
    }

    pub(crate) fn resolve(self) -> ResolvedSeparateConfig {
        let codec = self.codec_or_default();
        ResolvedSeparateConfig {
            id: self.id,
            check_gets: self.check_gets,
            check_defaults: self.check_defaults,
            pipeline: self.pipeline,
            codec,
            backend: self.backend.unwrap_or_else(default_backend),
        }
    }
}

impl fmt::Debug for SeparateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeparateConfig")
            .field("id", &self.id)
            .field("check_gets", &self.check_gets)
            .field("check_defaults", &self.check_defaults)
            .field("pipeline", &self.pipeline)
            .field("codec", &self.codec.as_ref().map(|_| "<codec>"))
            .field("backend", &self.backend.as_ref().map(|_| "<backend>"))
            .finish()
    }
}

/// A [`SeparateConfig`] with every default filled in.
pub(crate) struct ResolvedSeparateConfig {
    pub id: Option<String>,
    pub check_gets: bool,
    pub check_defaults: bool,
    pub pipeline: Pipeline,
    pub codec: Arc<dyn Codec>,
    pub backend: Arc<dyn Backend>,
}
