//! Cache Storage read by a script evaluated inside the page.
//!
//! The scripts walk `window.caches` the way a page (or an extension running
//! in it) would: `keys()`, `open()`, `match()` and a blob read for the size.
//! Every script answers with a tagged envelope instead of throwing, so
//! failures arrive as data and map straight onto [`CollectionError`].

use cachesnap_core::CollectionError;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::session::BrowserSession;
use crate::source::{CacheRef, CacheSource, EntryPage, EntryQuery};

const LIST_CACHES: &str = r#"(async () => {
  if (!('caches' in self)) {
    return { status: 'unsupported', error: 'CacheStorage is not available in this page' };
  }
  try {
    return { status: 'ok', data: await caches.keys() };
  } catch (e) {
    return { status: 'failed', error: String((e && e.message) || e) };
  }
})()"#;

const LIST_ENTRIES: &str = r#"(async (name, skip, limit) => {
  if (!('caches' in self)) {
    return { status: 'unsupported', error: 'CacheStorage is not available in this page' };
  }
  try {
    if (!(await caches.has(name))) {
      return { status: 'failed', error: 'cache no longer exists' };
    }
    const cache = await caches.open(name);
    const requests = await cache.keys();
    const entries = [];
    for (const request of requests.slice(skip, skip + limit)) {
      const response = await cache.match(request);
      if (!response) {
        entries.push({ url: request.url });
        continue;
      }
      const headers = {};
      response.headers.forEach((value, key) => { headers[key] = value; });
      const blob = await response.clone().blob();
      entries.push({
        url: request.url,
        type: response.headers.get('content-type'),
        size: blob.size,
        headers,
        status: response.status,
        statusText: response.statusText,
      });
    }
    return { status: 'ok', data: { entries, total: requests.length } };
  } catch (e) {
    return { status: 'failed', error: String((e && e.message) || e) };
  }
})"#;

/// Envelope every page script answers with.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum ScriptReply<T> {
    Ok { data: T },
    Unsupported { error: String },
    Failed { error: String },
}

impl<T> ScriptReply<T> {
    fn into_result(self, wrap: impl FnOnce(String) -> CollectionError) -> Result<T, CollectionError> {
        match self {
            ScriptReply::Ok { data } => Ok(data),
            ScriptReply::Unsupported { error } => Err(CollectionError::Unsupported(error)),
            ScriptReply::Failed { error } => Err(wrap(error)),
        }
    }
}

/// [`CacheSource`] evaluating scripts inside the navigated page.
pub struct ScriptSource {
    session: BrowserSession,
}

impl ScriptSource {
    pub fn new(session: BrowserSession) -> Self {
        Self { session }
    }

    async fn evaluate<T: DeserializeOwned>(
        &self, expression: String, wrap: impl Fn(String) -> CollectionError,
    ) -> Result<T, CollectionError> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(&wrap)?;

        let reply: ScriptReply<T> = self
            .session
            .page()
            .evaluate_expression(params)
            .await
            .map_err(|e| wrap(format!("script evaluation failed: {e}")))?
            .into_value()
            .map_err(|e| wrap(format!("unexpected script result: {e}")))?;

        reply.into_result(wrap)
    }
}

#[async_trait::async_trait]
impl CacheSource for ScriptSource {
    fn surface(&self) -> &'static str {
        "script"
    }

    async fn list_caches(&self) -> Result<Vec<CacheRef>, CollectionError> {
        let names: Vec<String> = self
            .evaluate(LIST_CACHES.to_string(), CollectionError::ListCaches)
            .await?;
        Ok(names.into_iter().map(CacheRef::named).collect())
    }

    async fn list_entries(&self, cache: &CacheRef, query: &EntryQuery) -> Result<EntryPage, CollectionError> {
        let expression = entries_expression(&cache.id, query)
            .map_err(|e| CollectionError::list_entries(&cache.name, e))?;

        self.evaluate(expression, |reason| CollectionError::list_entries(&cache.name, reason))
            .await
    }

    async fn release(&self) -> Result<(), CollectionError> {
        self.session.release().await
    }
}

/// Call expression for [`LIST_ENTRIES`] with JSON-encoded arguments.
fn entries_expression(name: &str, query: &EntryQuery) -> Result<String, serde_json::Error> {
    let args = [
        serde_json::to_string(name)?,
        query.skip.to_string(),
        query.limit.to_string(),
    ];
    Ok(format!("{LIST_ENTRIES}({})", args.join(", ")))
}
