//! Main language server implementation

use std::collections::HashMap;
use std::sync::Arc;

use iatf_analysis::completion::{completion_items, CompletionCandidate};
use iatf_analysis::hover::hover_at;
use iatf_analysis::navigation;
use iatf_analysis::symbols::document_symbols;
use iatf_parser::iatf::diagnostics::{Diagnostic as IatfDiagnostic, Severity};
use iatf_parser::iatf::validate::validate;
use iatf_parser::iatf::{parse, Document};
use tokio::sync::RwLock;
use tower_lsp::async_trait;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionOptions, CompletionParams, CompletionResponse, Diagnostic,
    DiagnosticSeverity, DocumentSymbol, DocumentSymbolParams, DocumentSymbolResponse,
    GotoDefinitionParams, GotoDefinitionResponse, Hover, HoverContents, HoverParams,
    HoverProviderCapability, InitializeParams, InitializeResult, InitializedParams, Location,
    MarkupContent, MarkupKind, NumberOrString, OneOf, Position, Range, ReferenceParams,
    ServerCapabilities, ServerInfo, TextDocumentItem, TextDocumentSyncCapability,
    TextDocumentSyncKind, Url,
};
use tower_lsp::Client;

/// The slice of `tower_lsp::Client` the server actually uses, so tests can
/// substitute a recording client.
#[async_trait]
pub trait LspClient: Send + Sync + 'static {
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>);
}

#[async_trait]
impl LspClient for Client {
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>) {
        Client::publish_diagnostics(self, uri, diagnostics, None).await;
    }
}

/// Seam between protocol plumbing and document analysis.
pub trait FeatureProvider: Send + Sync + 'static {
    fn diagnostics(&self, document: &Document) -> Vec<IatfDiagnostic>;
    fn completion(&self, document: &Document, position: Position) -> Vec<CompletionCandidate>;
    fn hover(&self, document: &Document, position: Position) -> Option<(String, Range)>;
    fn definition(&self, document: &Document, position: Position) -> Option<Range>;
    fn references(
        &self,
        document: &Document,
        position: Position,
        include_declaration: bool,
    ) -> Vec<Range>;
    fn document_symbols(&self, document: &Document) -> Vec<DocumentSymbol>;
}

#[derive(Default)]
pub struct DefaultFeatureProvider;

impl FeatureProvider for DefaultFeatureProvider {
    fn diagnostics(&self, document: &Document) -> Vec<IatfDiagnostic> {
        validate(document).diagnostics
    }

    fn completion(&self, document: &Document, position: Position) -> Vec<CompletionCandidate> {
        completion_items(document, position)
    }

    fn hover(&self, document: &Document, position: Position) -> Option<(String, Range)> {
        hover_at(document, position)
    }

    fn definition(&self, document: &Document, position: Position) -> Option<Range> {
        navigation::definition(document, position)
    }

    fn references(
        &self,
        document: &Document,
        position: Position,
        include_declaration: bool,
    ) -> Vec<Range> {
        navigation::references(document, position, include_declaration)
    }

    fn document_symbols(&self, document: &Document) -> Vec<DocumentSymbol> {
        document_symbols(document)
    }
}

#[derive(Default)]
struct DocumentStore {
    entries: RwLock<HashMap<Url, Arc<Document>>>,
}

impl DocumentStore {
    async fn upsert(&self, uri: Url, text: &str) -> Arc<Document> {
        let document = Arc::new(parse(text));
        self.entries.write().await.insert(uri, document.clone());
        document
    }

    async fn get(&self, uri: &Url) -> Option<Arc<Document>> {
        self.entries.read().await.get(uri).cloned()
    }

    async fn remove(&self, uri: &Url) {
        self.entries.write().await.remove(uri);
    }
}

pub struct IatfLanguageServer<C = Client, P = DefaultFeatureProvider> {
    client: C,
    documents: DocumentStore,
    features: Arc<P>,
}

impl IatfLanguageServer<Client, DefaultFeatureProvider> {
    pub fn new(client: Client) -> Self {
        Self::with_features(client, Arc::new(DefaultFeatureProvider))
    }
}

impl<C, P> IatfLanguageServer<C, P>
where
    C: LspClient,
    P: FeatureProvider,
{
    pub fn with_features(client: C, features: Arc<P>) -> Self {
        Self {
            client,
            documents: DocumentStore::default(),
            features,
        }
    }

    async fn update_document(&self, uri: Url, text: &str) {
        let document = self.documents.upsert(uri.clone(), text).await;
        let diagnostics = self
            .features
            .diagnostics(&document)
            .iter()
            .map(to_lsp_diagnostic)
            .collect();
        self.client.publish_diagnostics(uri, diagnostics).await;
    }

    async fn document(&self, uri: &Url) -> Option<Arc<Document>> {
        self.documents.get(uri).await
    }
}

fn to_lsp_diagnostic(diagnostic: &IatfDiagnostic) -> Diagnostic {
    let start = Position {
        line: diagnostic.line as u32,
        character: diagnostic.column as u32,
    };
    let end = Position {
        line: diagnostic.line as u32,
        character: (diagnostic.column + diagnostic.len) as u32,
    };
    Diagnostic {
        range: Range { start, end },
        severity: Some(match diagnostic.severity {
            Severity::Error => DiagnosticSeverity::ERROR,
            Severity::Warning => DiagnosticSeverity::WARNING,
        }),
        code: Some(NumberOrString::String(diagnostic.kind.to_string())),
        source: Some("iatf".to_string()),
        message: diagnostic.message.clone(),
        ..Diagnostic::default()
    }
}

fn to_completion_item(candidate: &CompletionCandidate) -> CompletionItem {
    CompletionItem {
        label: candidate.label.clone(),
        detail: candidate.detail.clone(),
        kind: Some(candidate.kind),
        insert_text: Some(candidate.insert_text.clone()),
        ..CompletionItem::default()
    }
}

#[async_trait]
impl<C, P> tower_lsp::LanguageServer for IatfLanguageServer<C, P>
where
    C: LspClient,
    P: FeatureProvider,
{
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        let capabilities = ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            completion_provider: Some(CompletionOptions {
                trigger_characters: Some(vec![
                    "{".to_string(),
                    "@".to_string(),
                    "#".to_string(),
                    "/".to_string(),
                ]),
                ..CompletionOptions::default()
            }),
            definition_provider: Some(OneOf::Left(true)),
            references_provider: Some(OneOf::Left(true)),
            document_symbol_provider: Some(OneOf::Left(true)),
            ..ServerCapabilities::default()
        };

        Ok(InitializeResult {
            capabilities,
            server_info: Some(ServerInfo {
                name: "iatf-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {}

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: tower_lsp::lsp_types::DidOpenTextDocumentParams) {
        let TextDocumentItem { uri, text, .. } = params.text_document;
        self.update_document(uri, &text).await;
    }

    async fn did_change(&self, params: tower_lsp::lsp_types::DidChangeTextDocumentParams) {
        if let Some(change) = params.content_changes.into_iter().last() {
            self.update_document(params.text_document.uri, &change.text)
                .await;
        }
    }

    async fn did_close(&self, params: tower_lsp::lsp_types::DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.remove(&uri).await;
        self.client.publish_diagnostics(uri, Vec::new()).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        if let Some(document) = self.document(&uri).await {
            let items = self
                .features
                .completion(&document, params.text_document_position.position)
                .iter()
                .map(to_completion_item)
                .collect();
            Ok(Some(CompletionResponse::Array(items)))
        } else {
            Ok(None)
        }
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        if let Some(document) = self.document(&uri).await {
            let position = params.text_document_position_params.position;
            if let Some((contents, range)) = self.features.hover(&document, position) {
                return Ok(Some(Hover {
                    contents: HoverContents::Markup(MarkupContent {
                        kind: MarkupKind::Markdown,
                        value: contents,
                    }),
                    range: Some(range),
                }));
            }
        }
        Ok(None)
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        if let Some(document) = self.document(&uri).await {
            let position = params.text_document_position_params.position;
            if let Some(range) = self.features.definition(&document, position) {
                return Ok(Some(GotoDefinitionResponse::Scalar(Location {
                    uri,
                    range,
                })));
            }
        }
        Ok(None)
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = params.text_document_position.text_document.uri;
        if let Some(document) = self.document(&uri).await {
            let ranges = self.features.references(
                &document,
                params.text_document_position.position,
                params.context.include_declaration,
            );
            let locations = ranges
                .into_iter()
                .map(|range| Location {
                    uri: uri.clone(),
                    range,
                })
                .collect();
            return Ok(Some(locations));
        }
        Ok(None)
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        if let Some(document) = self.document(&params.text_document.uri).await {
            let symbols = self.features.document_symbols(&document);
            Ok(Some(DocumentSymbolResponse::Nested(symbols)))
        } else {
            Ok(None)
        }
    }
}
