//! HTTP access, behind a trait so the pipeline can run against fakes.

use std::io::{self, Cursor, Write};

use curl::easy::Easy;
use failure::Error;
use failure_derive::Fail;

/// Downloads one URL into memory.
///
/// Every artifact fetch is independent; implementations are free to open
/// a fresh connection per call.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, Error>;
}

/// Production fetcher backed by libcurl.
pub struct CurlFetcher;

impl Fetcher for CurlFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, Error> {
        download_buffer(url)
    }
}

#[derive(Debug, Fail)]
#[fail(display = "HTTP 404 not found")]
pub struct HttpNotFound;

#[inline]
fn download_buffer(url: &str) -> Result<Vec<u8>, Error> {
    let mut buffer = Vec::with_capacity(2048);
    {
        let mut cursor = Cursor::new(buffer);
        download(url, &mut cursor)?;
        buffer = cursor.into_inner();
    }
    Ok(buffer)
}

fn download<W: Write>(url: &str, output: &mut W) -> Result<(), Error> {
    let mut easy = Easy::new();
    easy.url(url)?;
    easy.fail_on_error(true)?;
    let mut error: Option<io::Error> = None;
    let result = {
        let mut transfer = easy.transfer();
        transfer.write_function(
            |data| if let Err(e) = output.write_all(data) {
                error = Some(e);
                Ok(0)
            } else {
                Ok(data.len())
            },
        )?;
        transfer.perform()
    };
    if easy.response_code()? == 404 {
        return Err(HttpNotFound.into())
    }
    match result {
        Err(e) => {
            if let Some(actual_error) = error.take() {
                Err(actual_error.into())
            } else {
                Err(e.into())
            }
        }
        Ok(_) => {
            assert!(error.is_none());
            Ok(())
        }
    }
}
