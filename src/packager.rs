use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Level, debug, info, warn};

use crate::color::{ColorProfileSource, IccProfileFile};
use crate::config::PackagerConfig;
use crate::error::{PackagingError, PackagingStage, PanicMessage};
use crate::facturx::{InvoiceMetadata, extend_metadata};
use crate::outcome::PackagingResult;
use crate::pdfa::{
    ConformantShell, EmbeddedFileSpec, OutputIntent, PdfAConformance, copy_all_pages, embed_file,
    open_document,
};
use crate::request::{self, PackagingRequest};

/// Turns a PDF plus an optional invoice XML into a PDF/A-3 hybrid invoice.
///
/// A `Packager` holds only configuration and the shared colour profile
/// source; every call builds its own document. Share one behind an `Arc`
/// to package on several threads at once.
///
/// ```no_run
/// use facturx_packager::{IccProfileFile, Packager};
///
/// let packager = Packager::new(IccProfileFile::new("sRGB2014.icc"));
/// let pdf = std::fs::read("invoice.pdf").unwrap();
/// let xml = std::fs::read("factur-x.xml").unwrap();
///
/// match packager.package(&pdf, Some(xml.as_slice())).into_document() {
///     Some(bytes) => std::fs::write("invoice-facturx.pdf", bytes).unwrap(),
///     None => eprintln!("packaging failed"),
/// }
/// ```
pub struct Packager {
    conformance: PdfAConformance,
    output_intent: OutputIntent,
    invoice: InvoiceMetadata,
    profile: Arc<dyn ColorProfileSource>,
}

impl Packager {
    /// A packager with the default PDF/A-3U output intent and Factur-X
    /// EXTENDED metadata.
    pub fn new(profile: impl ColorProfileSource + 'static) -> Self {
        Self {
            conformance: PdfAConformance::default(),
            output_intent: OutputIntent::default(),
            invoice: InvoiceMetadata::default(),
            profile: Arc::new(profile),
        }
    }

    /// A packager reading its ICC profile from `config.icc_profile` on first
    /// use. Packagers built from configs naming the same path share one
    /// process-wide cache of that file.
    pub fn from_config(config: &PackagerConfig) -> Self {
        Self::new(IccProfileFile::shared(&config.icc_profile))
            .with_conformance(config.conformance)
            .with_output_intent(config.output_intent.clone())
            .with_invoice_metadata(config.invoice.clone())
    }

    pub fn with_conformance(mut self, conformance: PdfAConformance) -> Self {
        self.conformance = conformance;
        self
    }

    pub fn with_output_intent(mut self, intent: OutputIntent) -> Self {
        self.output_intent = intent;
        self
    }

    pub fn with_invoice_metadata(mut self, invoice: InvoiceMetadata) -> Self {
        self.invoice = invoice;
        self
    }

    pub fn conformance(&self) -> PdfAConformance {
        self.conformance
    }

    pub fn invoice_metadata(&self) -> &InvoiceMetadata {
        &self.invoice
    }

    /// Package `source`, embedding `payload` when it is present and not blank.
    /// Never panics; every failure is reported in the result.
    pub fn package(&self, source: &[u8], payload: Option<&[u8]>) -> PackagingResult {
        self.try_package(source, payload).into()
    }

    pub fn package_request(&self, request: &PackagingRequest) -> PackagingResult {
        self.package(&request.source, request.payload.as_deref())
    }

    /// Like [`Packager::package`], returning the structured error.
    pub fn try_package(
        &self,
        source: &[u8],
        payload: Option<&[u8]>,
    ) -> Result<Vec<u8>, PackagingError> {
        let start = Instant::now();
        let span = tracing::span!(
            Level::INFO,
            "facturx.package",
            source_len = source.len(),
            payload_len = payload.map_or(0, <[u8]>::len),
            conformance = %self.conformance
        );
        let _guard = span.enter();

        let stage = Cell::new(PackagingStage::Validating);
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run(source, payload, &stage)))
            .unwrap_or_else(|panic| {
                Err(PackagingError::Unexpected {
                    stage: stage.get(),
                    source: PanicMessage(panic_message(&*panic)),
                })
            });

        let elapsed_micros = start.elapsed().as_micros();
        match &result {
            Ok(document) => info!(output_len = document.len(), elapsed_micros, "package_success"),
            Err(err) => warn!(
                kind = ?err.kind(),
                stage = %err.stage(),
                error = %err,
                elapsed_micros,
                "package_failure"
            ),
        }
        result
    }

    fn run(
        &self,
        source: &[u8],
        payload: Option<&[u8]>,
        stage: &Cell<PackagingStage>,
    ) -> Result<Vec<u8>, PackagingError> {
        let request = request::validate(source, payload)?;

        enter(stage, PackagingStage::BuildingShell);
        let mut shell =
            ConformantShell::create(self.conformance, &self.output_intent, self.profile.as_ref())
                .map_err(PackagingError::ShellCreation)?;
        shell.add_fingerprint(request.source);
        if let Some(payload) = request.payload {
            shell.add_fingerprint(payload);
        }

        enter(stage, PackagingStage::Transplanting);
        let document =
            open_document(request.source).map_err(PackagingError::SourceDocumentUnreadable)?;
        let pages = copy_all_pages(document, &mut shell)
            .map_err(PackagingError::SourceDocumentUnreadable)?;
        if pages == 0 {
            warn!("source_has_no_pages");
        }

        enter(stage, PackagingStage::ExtendingMetadata);
        let meta = shell
            .metadata_tree()
            .map_err(PackagingError::MetadataConstruction)?;
        extend_metadata(meta, &self.invoice).map_err(PackagingError::MetadataConstruction)?;

        match request.payload {
            Some(payload) => {
                enter(stage, PackagingStage::Embedding);
                embed_file(&mut shell, payload, &EmbeddedFileSpec::invoice_now())
                    .map_err(PackagingError::Attachment)?;
            }
            None => debug!("no payload, embedding skipped"),
        }

        enter(stage, PackagingStage::Finalizing);
        shell.finalize().map_err(PackagingError::Serialization)
    }
}

fn enter(stage: &Cell<PackagingStage>, next: PackagingStage) {
    stage.set(next);
    debug!(stage = %next, "stage");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}
