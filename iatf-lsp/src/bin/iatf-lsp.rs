use iatf_lsp::IatfLanguageServer;
use tokio::io::{stdin, stdout};
use tower_lsp::{LspService, Server};

#[tokio::main]
async fn main() {
    let stdin = stdin();
    let stdout = stdout();
    let (service, socket) = LspService::new(IatfLanguageServer::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
