use async_trait::async_trait;
use form_spec::{
    CategoryId, CategorySpec, Control, FieldValue, FormState, RenderError, RenderPayload,
    ValidationResult, Validator, ValueMap, build_render_payload,
};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::port::{FieldStore, StoreError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session was cancelled")]
    Cancelled,
    #[error("session is closed")]
    Closed,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("application has {} validation error(s)", .0.errors.len())]
    Invalid(ValidationResult),
}

/// What the applicant hands to the backend on a successful submit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationSubmission {
    pub category_id: CategoryId,
    pub values: ValueMap,
}

/// Receives submitted applications.
#[async_trait]
pub trait ApplicationSink: Send + Sync {
    async fn submit(&self, submission: ApplicationSubmission) -> Result<(), StoreError>;
}

/// Sink that keeps every submission in memory.
#[derive(Debug, Default)]
pub struct InMemoryApplicationSink {
    submissions: Mutex<Vec<ApplicationSubmission>>,
}

impl InMemoryApplicationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn submissions(&self) -> Vec<ApplicationSubmission> {
        self.submissions.lock().await.clone()
    }
}

#[async_trait]
impl ApplicationSink for InMemoryApplicationSink {
    async fn submit(&self, submission: ApplicationSubmission) -> Result<(), StoreError> {
        self.submissions.lock().await.push(submission);
        Ok(())
    }
}

/// One applicant filling in one category's form.
///
/// Every request runs under the session's cancellation token; once the token
/// fires, in-flight results are dropped instead of reaching the form.
#[derive(Debug)]
pub struct ApplicationSession {
    category: CategorySpec,
    form: Option<FormState>,
    validator: Validator,
    cancel: CancellationToken,
    busy: watch::Sender<bool>,
}

impl ApplicationSession {
    pub async fn open<S>(
        store: &S,
        category_id: &str,
        cancel: CancellationToken,
    ) -> Result<Self, SessionError>
    where
        S: FieldStore + ?Sized,
    {
        Self::open_with(store, category_id, cancel, Validator::default()).await
    }

    pub async fn open_with<S>(
        store: &S,
        category_id: &str,
        cancel: CancellationToken,
        validator: Validator,
    ) -> Result<Self, SessionError>
    where
        S: FieldStore + ?Sized,
    {
        let (busy, _) = watch::channel(true);
        let category = guarded(&cancel, fetch_category(store, category_id)).await?;
        busy.send_replace(false);
        debug!(category = category_id, fields = category.fields.len(), "session opened");

        let form = FormState::for_category(&category).with_validator(validator.clone());
        Ok(Self {
            category,
            form: Some(form),
            validator,
            cancel,
            busy,
        })
    }

    pub fn category(&self) -> &CategorySpec {
        &self.category
    }

    pub fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    /// Receiver that observes the busy flag, for loading indicators.
    pub fn busy_signal(&self) -> watch::Receiver<bool> {
        self.busy.subscribe()
    }

    pub fn form(&self) -> Result<&FormState, SessionError> {
        self.form.as_ref().ok_or(SessionError::Closed)
    }

    pub fn on_change(&mut self, field_id: &str, value: FieldValue) -> Result<(), SessionError> {
        Ok(self.form_mut()?.on_change(field_id, value)?)
    }

    pub fn clear(&mut self, field_id: &str) -> Result<(), SessionError> {
        Ok(self.form_mut()?.clear(field_id)?)
    }

    pub fn toggle_option(&mut self, field_id: &str, option: &str) -> Result<bool, SessionError> {
        Ok(self.form_mut()?.toggle_option(field_id, option)?)
    }

    pub fn controls(&self) -> Result<Vec<Control>, SessionError> {
        Ok(self.form()?.controls())
    }

    pub fn payload(&self) -> Result<RenderPayload, SessionError> {
        Ok(build_render_payload(&self.category, self.form()?))
    }

    /// Re-fetches the definitions, keeping the values entered so far.
    pub async fn refresh<S>(&mut self, store: &S) -> Result<(), SessionError>
    where
        S: FieldStore + ?Sized,
    {
        self.form()?;
        self.busy.send_replace(true);
        let fetched = guarded(&self.cancel, fetch_category(store, &self.category.id)).await;
        self.busy.send_replace(false);
        let category = fetched?;

        let values = self.form.take().map(FormState::into_values).unwrap_or_default();
        self.form = Some(
            FormState::for_category(&category)
                .with_validator(self.validator.clone())
                .with_values(values),
        );
        self.category = category;
        Ok(())
    }

    /// Validates, then hands the visible values to `sink`.
    ///
    /// A successful submit starts a fresh, empty form. On any failure the
    /// entered values stay in place.
    pub async fn submit(
        &mut self,
        sink: &dyn ApplicationSink,
    ) -> Result<ApplicationSubmission, SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }
        let values = self.form_mut()?.submit().map_err(SessionError::Invalid)?;
        let submission = ApplicationSubmission {
            category_id: self.category.id.clone(),
            values,
        };

        self.busy.send_replace(true);
        let sent = guarded(&self.cancel, sink.submit(submission.clone())).await;
        self.busy.send_replace(false);
        if let Err(err) = &sent {
            error!(category = %self.category.id, error = %err, "application submit failed");
        }
        sent?;

        info!(
            category = %self.category.id,
            fields = submission.values.len(),
            "application submitted"
        );
        self.form = Some(FormState::for_category(&self.category).with_validator(self.validator.clone()));
        Ok(submission)
    }

    /// Cancels outstanding requests and drops the form.
    pub fn teardown(&mut self) {
        self.cancel.cancel();
        self.form = None;
        self.busy.send_replace(false);
    }

    fn form_mut(&mut self) -> Result<&mut FormState, SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Closed);
        }
        self.form.as_mut().ok_or(SessionError::Closed)
    }
}

impl Drop for ApplicationSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Awaits `request` unless `cancel` fires first; a result that lands after
/// cancellation is discarded.
async fn guarded<T, F>(cancel: &CancellationToken, request: F) -> Result<T, SessionError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(SessionError::Cancelled),
        output = request => output,
    };
    if cancel.is_cancelled() {
        return Err(SessionError::Cancelled);
    }
    Ok(output?)
}

async fn fetch_category<S>(store: &S, category_id: &str) -> Result<CategorySpec, StoreError>
where
    S: FieldStore + ?Sized,
{
    let name = store
        .categories()
        .await?
        .into_iter()
        .find(|row| row.id == category_id)
        .map(|row| row.name)
        .ok_or_else(|| StoreError::CategoryNotFound(category_id.to_string()))?;
    let fields = store.list(category_id).await?;
    Ok(CategorySpec::new(category_id, name).with_fields(fields))
}
