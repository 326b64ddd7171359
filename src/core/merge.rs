//! Ordered reassembly of fetched chunks

use log::{debug, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::core::error::{Error, Result};
use crate::core::fetch::ChunkResult;

/// Concatenates chunk sinks into `destination` in sequence order and deletes them.
///
/// The input order does not matter; results are sorted first. The sequence
/// indices must be exactly `0..n`: a gap or duplicate means the coordinator
/// is broken and is reported as an `InvariantError` before anything is written.
pub async fn merge_chunks<W>(mut results: Vec<ChunkResult>, destination: &mut W) -> Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    results.sort_by_key(|r| r.sequence_index);
    for (position, result) in results.iter().enumerate() {
        if result.sequence_index as usize != position {
            return Err(Error::InvariantError(format!(
                "merge sequence broken at position {position}: found chunk {}",
                result.sequence_index
            )));
        }
    }

    let mut total = 0u64;
    let mut pending = results.into_iter();
    while let Some(result) = pending.next() {
        match append_chunk(&result, destination).await {
            Ok(copied) => {
                total += copied;
                discard(result);
            }
            Err(err) => {
                discard(result);
                pending.for_each(discard);
                return Err(err);
            }
        }
    }

    destination.flush().await.map_err(Error::MergeError)?;
    debug!("Merged {total} bytes");
    Ok(total)
}

async fn append_chunk<W>(result: &ChunkResult, destination: &mut W) -> Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut reader = result.sink.reader().await.map_err(Error::MergeError)?;
    let copied = tokio::io::copy(&mut reader, destination)
        .await
        .map_err(Error::MergeError)?;

    if copied != result.bytes_written {
        return Err(Error::MergeError(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!(
                "chunk {} holds {copied} bytes, expected {}",
                result.sequence_index, result.bytes_written
            ),
        )));
    }
    Ok(copied)
}

/// Deletes a sink; failures are logged and otherwise ignored
fn discard(result: ChunkResult) {
    let index = result.sink.index();
    let path = result.sink.path().to_path_buf();
    if let Err(err) = result.sink.close() {
        warn!("Failed to remove chunk {index} file {}: {err}", path.display());
    }
}
