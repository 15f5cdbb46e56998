//! A synthetic feed of posts standing in for a remote API.
//!
//! The feed grows by one post on every full sync, serves pages newest
//! first, sleeps for a configurable latency and can fail every Nth request.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use synclist::cache::Cacheable;
use synclist::sync::FetchFuture;
use synclist::{ListSource, Page};

const AUTHORS: [&str; 4] = ["ada", "grace", "linus", "margaret"];
const EPOCH: i64 = 1_760_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
  pub id: String,
  pub author: String,
  pub title: String,
  /// Unix seconds
  pub published: i64,
}

impl Post {
  fn numbered(n: u32) -> Self {
    Self {
      id: format!("p{:04}", n),
      author: AUTHORS[n as usize % AUTHORS.len()].to_string(),
      title: format!("Post number {}", n),
      published: EPOCH + i64::from(n) * 60,
    }
  }
}

impl Cacheable for Post {
  fn cache_key(&self) -> String {
    self.id.clone()
  }
}

/// Knobs for the synthetic feed.
#[derive(Debug, Clone, Copy)]
pub struct FeedOptions {
  pub total: u32,
  pub page_size: u32,
  pub latency: Duration,
  /// Fail every Nth request (0 never fails)
  pub fail_every: u32,
}

#[derive(Debug)]
struct Feed {
  options: FeedOptions,
  created: AtomicU32,
  requests: AtomicU32,
}

impl Feed {
  fn page(&self, page: u32) -> Result<Page<Post>, String> {
    let request = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
    if self.options.fail_every > 0 && request % self.options.fail_every == 0 {
      return Err(format!("simulated network error (request {})", request));
    }

    let created = self.created.load(Ordering::SeqCst);
    let size = self.options.page_size.max(1);
    let skip = (page.max(1) - 1).saturating_mul(size);
    let items: Vec<Post> = (0..created)
      .rev()
      .skip(skip as usize)
      .take(size as usize)
      .map(Post::numbered)
      .collect();
    let has_more = skip.saturating_add(size) < created;

    Ok(Page::new(items, has_more))
  }
}

/// [`ListSource`] over the synthetic feed.
#[derive(Debug, Clone)]
pub struct DemoSource {
  feed: Arc<Feed>,
}

impl DemoSource {
  pub fn new(options: FeedOptions) -> Self {
    Self {
      feed: Arc::new(Feed {
        options,
        created: AtomicU32::new(options.total),
        requests: AtomicU32::new(0),
      }),
    }
  }

  fn fetch(&self, page: u32, publish: bool) -> FetchFuture<Page<Post>> {
    let feed = self.feed.clone();
    Box::pin(async move {
      tokio::time::sleep(feed.options.latency).await;
      if publish {
        feed.created.fetch_add(1, Ordering::SeqCst);
      }
      feed.page(page)
    })
  }
}

impl ListSource<Post> for DemoSource {
  fn sync(&self, _user_initiated: bool) -> FetchFuture<Page<Post>> {
    self.fetch(1, true)
  }

  fn supports_pagination(&self) -> bool {
    true
  }

  fn load_more(&self, page: u32) -> FetchFuture<Page<Post>> {
    self.fetch(page, false)
  }
}
