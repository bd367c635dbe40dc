//! Beacon dispatch
//!
//! A [`Context`] owns everything one collection target needs: its base URL,
//! options, an event and an error registry, and the senders. Emitting runs
//! the same pipeline for both kinds:
//!
//! 1. shape check (id and endpoint)
//! 2. registration check, unless `no_registration`
//! 3. field type check against the descriptor schema
//! 4. severity resolution (errors only)
//! 5. URL build: `<base>/<endpoint>?<evid|errc>=<id>[&sev=N]&field=value...`
//! 6. hand-off to the sender unless `disabled`; mirror if `log`

use serde_json::Value;
use std::sync::Arc;

use crate::config::Options;
use crate::descriptor::{Descriptor, Kind, Severity, SeverityValue};
use crate::error::{BiError, Result};
use crate::registry::{Registry, identity_key};
use crate::transport::{HttpSender, LogSender, Sender};
use crate::url::{Fields, append_params, join_url};
use crate::validate::{check_descriptor_shape, check_fields};

/// Field consumed into the severity of an error beacon
const SEV_FIELD: &str = "sev";

/// Severity token for an error beacon.
///
/// Descriptor severity wins, then a `sev` field, then `error` (30). Names
/// map through [`Severity`] with unknown names giving 30. Any non-zero
/// number passes through as written; zero and other values give 30.
pub fn resolve_severity(desc: &Descriptor, fields: &Fields) -> String {
    if let Some(severity) = desc.severity.as_ref().filter(|s| s.is_set()) {
        return severity.token();
    }

    let from_field = match fields.get(SEV_FIELD) {
        Some(Value::String(name)) => Some(SeverityValue::Named(name.clone())),
        Some(Value::Number(number)) => Some(SeverityValue::Level(number.clone())),
        _ => None,
    };

    from_field
        .filter(|severity| severity.is_set())
        .map(|severity| severity.token())
        .unwrap_or_else(|| Severity::default().level().to_string())
}

pub struct Context {
    base: String,
    options: Options,
    events: Registry,
    errors: Registry,
    sender: Box<dyn Sender>,
    mirror: Box<dyn Sender>,
}

impl Context {
    /// Context sending over HTTP and mirroring to the log
    pub fn new(base: impl Into<String>, options: Options) -> Self {
        Self::with_transport(base, options, HttpSender::default(), LogSender)
    }

    /// Context with injected senders
    pub fn with_transport(
        base: impl Into<String>,
        options: Options,
        sender: impl Sender + 'static,
        mirror: impl Sender + 'static,
    ) -> Self {
        Self {
            base: base.into(),
            options,
            events: Registry::new(Kind::Event),
            errors: Registry::new(Kind::Error),
            sender: Box::new(sender),
            mirror: Box::new(mirror),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn events(&self) -> &Registry {
        &self.events
    }

    pub fn errors(&self) -> &Registry {
        &self.errors
    }

    pub fn register_events<'a, I>(&mut self, descs: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Arc<Descriptor>>,
    {
        self.events.register_many(descs, &self.options)
    }

    pub fn register_errors<'a, I>(&mut self, descs: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Arc<Descriptor>>,
    {
        self.errors.register_many(descs, &self.options)
    }

    /// Emit an event beacon
    pub fn event(&self, desc: &Arc<Descriptor>, fields: Option<&Fields>) -> Result<()> {
        self.emit(Kind::Event, desc, fields)
    }

    /// Emit an error beacon
    pub fn error(&self, desc: &Arc<Descriptor>, fields: Option<&Fields>) -> Result<()> {
        self.emit(Kind::Error, desc, fields)
    }

    fn registry(&self, kind: Kind) -> &Registry {
        match kind {
            Kind::Event => &self.events,
            Kind::Error => &self.errors,
        }
    }

    /// Full beacon URL for a descriptor and its fields, after validation
    pub fn build_url(&self, kind: Kind, desc: &Arc<Descriptor>, fields: Option<&Fields>) -> Result<String> {
        let empty = Fields::new();
        let fields = fields.unwrap_or(&empty);

        check_descriptor_shape(kind, desc, &self.options)?;

        if !self.registry(kind).is_registered(desc, &self.options) {
            return Err(BiError::UnregisteredDescriptor {
                kind,
                desc: desc.clone(),
            });
        }

        check_fields(kind, desc, fields)?;

        let mut url = join_url(&self.base, &identity_key(kind, desc, &self.options));
        let exclude: &[&str] = match kind {
            Kind::Event => &[],
            Kind::Error => {
                url.push_str(&format!("&sev={}", resolve_severity(desc, fields)));
                &[SEV_FIELD]
            }
        };

        append_params(&url, fields, exclude)
    }

    fn emit(&self, kind: Kind, desc: &Arc<Descriptor>, fields: Option<&Fields>) -> Result<()> {
        let url = self.build_url(kind, desc, fields)?;

        if !self.options.disabled {
            self.sender.send(&url);
        }
        if self.options.log {
            self.mirror.send(&url);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldType;
    use crate::transport::RecordingSender;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn recording(base: &str, options: Options) -> (Context, RecordingSender, RecordingSender) {
        let sent = RecordingSender::new();
        let mirrored = RecordingSender::new();
        let ctx = Context::with_transport(base, options, sent.clone(), mirrored.clone());
        (ctx, sent, mirrored)
    }

    #[test]
    fn test_event_url() {
        let (mut ctx, sent, _) = recording("http://h/", Options::default());
        let desc = Descriptor::event("x").with_endpoint("/e").shared();
        ctx.register_events([&desc]).unwrap();

        ctx.event(&desc, Some(&fields(json!({"a": 1, "b": "two"})))).unwrap();

        assert_eq!(sent.urls(), vec!["http://h/e?evid=x&a=1&b=two"]);
    }

    #[test]
    fn test_event_without_fields() {
        let (mut ctx, sent, _) = recording("http://h", Options::default());
        let desc = Descriptor::event("7").with_endpoint("e").shared();
        ctx.register_events([&desc]).unwrap();

        ctx.event(&desc, None).unwrap();

        assert_eq!(sent.last().as_deref(), Some("http://h/e?evid=7"));
    }

    #[test]
    fn test_error_named_severity_consumes_sev_field() {
        let (mut ctx, sent, _) = recording("http://h/", Options::default());
        let desc = Descriptor::error("E1").with_endpoint("/err").shared();
        ctx.register_errors([&desc]).unwrap();

        ctx.error(&desc, Some(&fields(json!({"sev": "warning", "msg": "boom"})))).unwrap();

        let url = sent.last().unwrap();
        assert_eq!(url, "http://h/err?errc=E1&sev=20&msg=boom");
        assert_eq!(url.matches("sev=").count(), 1);
    }

    #[test]
    fn test_error_default_severity() {
        let (mut ctx, sent, _) = recording("http://h/", Options::default());
        let desc = Descriptor::error("E2").with_endpoint("/err").shared();
        ctx.register_errors([&desc]).unwrap();

        ctx.error(&desc, None).unwrap();

        assert_eq!(sent.last().as_deref(), Some("http://h/err?errc=E2&sev=30"));
    }

    #[test]
    fn test_resolve_severity_precedence() {
        let with_sev = Descriptor::error("E").with_severity("fatal");
        assert_eq!(resolve_severity(&with_sev, &fields(json!({"sev": "warning"}))), "40");

        let plain = Descriptor::error("E");
        assert_eq!(resolve_severity(&plain, &fields(json!({"sev": "recoverable"}))), "10");
        assert_eq!(resolve_severity(&plain, &fields(json!({"sev": 25}))), "25");
        assert_eq!(resolve_severity(&plain, &fields(json!({"sev": "nope"}))), "30");
        assert_eq!(resolve_severity(&plain, &fields(json!({"sev": 0}))), "30");
        assert_eq!(resolve_severity(&plain, &fields(json!({"sev": true}))), "30");
        assert_eq!(resolve_severity(&plain, &Fields::new()), "30");

        let zero = Descriptor::error("E").with_severity(SeverityValue::Level(0.into()));
        assert_eq!(resolve_severity(&zero, &fields(json!({"sev": "warning"}))), "20");
    }

    #[test]
    fn test_error_numeric_severity_passes_through() {
        let (mut ctx, sent, _) = recording("http://h/", Options::default());
        let desc = Descriptor::error("E1").with_endpoint("/err").shared();
        ctx.register_errors([&desc]).unwrap();

        for sev in [json!(25.5), json!(-5), json!(35), json!(2.0)] {
            ctx.error(&desc, Some(&fields(json!({"sev": sev})))).unwrap();
        }

        assert_eq!(
            sent.urls(),
            vec![
                "http://h/err?errc=E1&sev=25.5",
                "http://h/err?errc=E1&sev=-5",
                "http://h/err?errc=E1&sev=35",
                "http://h/err?errc=E1&sev=2",
            ]
        );

        let fixed = Descriptor::error("E2")
            .with_endpoint("/err")
            .with_severity(serde_json::Number::from_f64(12.5).unwrap())
            .shared();
        ctx.register_errors([&fixed]).unwrap();
        ctx.error(&fixed, Some(&fields(json!({"sev": 99})))).unwrap();
        assert_eq!(sent.last().as_deref(), Some("http://h/err?errc=E2&sev=12.5"));
    }

    #[test]
    fn test_invalid_descriptor() {
        let (ctx, sent, _) = recording("http://h/", Options::default());
        let desc = Descriptor::event("x").shared();

        let err = ctx.event(&desc, None).unwrap_err();

        assert!(matches!(err, BiError::InvalidDescriptor { kind: Kind::Event, .. }));
        assert!(sent.urls().is_empty());
    }

    #[test]
    fn test_unregistered_descriptor() {
        let (ctx, _, _) = recording("http://h/", Options::default());
        let desc = Descriptor::error("E1").with_endpoint("/err").shared();

        let err = ctx.error(&desc, None).unwrap_err();

        assert!(matches!(err, BiError::UnregisteredDescriptor { kind: Kind::Error, .. }));
        assert_eq!(err.to_string(), "Error not registered");
    }

    #[test]
    fn test_registered_as_event_is_not_an_error() {
        let (mut ctx, _, _) = recording("http://h/", Options::default());
        let desc = Descriptor {
            evid: Some("x".into()),
            errc: Some("x".into()),
            endpoint: Some("/both".into()),
            ..Descriptor::default()
        }
        .shared();
        ctx.register_events([&desc]).unwrap();

        assert!(ctx.event(&desc, None).is_ok());
        assert!(ctx.error(&desc, None).is_err());
    }

    #[test]
    fn test_no_registration_allows_unregistered() {
        let options = Options {
            no_registration: true,
            ..Options::default()
        };
        let (ctx, sent, _) = recording("http://h/", options);
        let desc = Descriptor::event("x").with_endpoint("/e").shared();

        ctx.event(&desc, None).unwrap();

        assert_eq!(sent.urls().len(), 1);
    }

    #[test]
    fn test_field_validation() {
        let (mut ctx, sent, _) = recording("http://h/", Options::default());
        let desc = Descriptor::event("x")
            .with_endpoint("/e")
            .with_field("count", FieldType::Number)
            .shared();
        ctx.register_events([&desc]).unwrap();

        let err = ctx.event(&desc, Some(&fields(json!({"count": "5"})))).unwrap_err();
        assert!(matches!(err, BiError::FieldValidation { .. }));
        assert!(sent.urls().is_empty());

        ctx.event(&desc, Some(&fields(json!({"count": 5})))).unwrap();
        assert_eq!(sent.last().as_deref(), Some("http://h/e?evid=x&count=5"));
    }

    #[test]
    fn test_default_endpoint_from_options() {
        let options = Options {
            events_endpoint: Some("/events".to_string()),
            errors_endpoint: Some("/errors".to_string()),
            ..Options::default()
        };
        let (mut ctx, sent, _) = recording("http://h/bi/", options);
        let event = Descriptor::event("login").shared();
        let error = Descriptor::error("E9").shared();
        ctx.register_events([&event]).unwrap();
        ctx.register_errors([&error]).unwrap();

        ctx.event(&event, None).unwrap();
        ctx.error(&error, None).unwrap();

        assert_eq!(
            sent.urls(),
            vec!["http://h/bi/events?evid=login", "http://h/bi/errors?errc=E9&sev=30"]
        );
    }

    #[test]
    fn test_disabled_skips_send_but_still_mirrors() {
        let options = Options {
            disabled: true,
            log: true,
            ..Options::default()
        };
        let (mut ctx, sent, mirrored) = recording("http://h/", options);
        let desc = Descriptor::event("x").with_endpoint("/e").shared();
        ctx.register_events([&desc]).unwrap();

        ctx.event(&desc, Some(&fields(json!({"ok": true})))).unwrap();

        assert!(sent.urls().is_empty());
        assert_eq!(mirrored.urls(), vec!["http://h/e?evid=x&ok=1"]);
    }

    #[test]
    fn test_no_mirror_without_log() {
        let (mut ctx, sent, mirrored) = recording("http://h/", Options::default());
        let desc = Descriptor::event("x").with_endpoint("/e").shared();
        ctx.register_events([&desc]).unwrap();

        ctx.event(&desc, None).unwrap();

        assert_eq!(sent.urls().len(), 1);
        assert!(mirrored.urls().is_empty());
    }

    #[test]
    fn test_null_field_fails_before_send() {
        let (mut ctx, sent, _) = recording("http://h/", Options::default());
        let desc = Descriptor::event("x").with_endpoint("/e").shared();
        ctx.register_events([&desc]).unwrap();

        let err = ctx.event(&desc, Some(&fields(json!({"gone": null})))).unwrap_err();

        assert!(matches!(err, BiError::UnsupportedValue { .. }));
        assert!(sent.urls().is_empty());
    }

    #[test]
    fn test_contexts_do_not_share_registries() {
        let (mut first, _, _) = recording("http://a/", Options::default());
        let (second, _, _) = recording("http://b/", Options::default());
        let desc = Descriptor::event("x").with_endpoint("/e").shared();

        first.register_events([&desc]).unwrap();

        assert!(first.event(&desc, None).is_ok());
        assert!(matches!(
            second.event(&desc, None),
            Err(BiError::UnregisteredDescriptor { .. })
        ));
    }
}
