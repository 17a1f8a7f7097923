use serve_stream::storage::disk::{DiskStorage, OnDirectory};
use serve_stream::{StreamService, Streamer};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let storage = DiskStorage::new("fixtures").on_directory(OnDirectory::ListFiles);
    let service = StreamService::new(Streamer::new(storage));

    // Run our service using `hyper`
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], 3000));
    hyper::Server::bind(&addr)
        .serve(tower::make::Shared::new(service))
        .await
        .expect("server error");
}
