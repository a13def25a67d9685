//! Curated IT-operations chunks used to demo the reranker without ingesting anything.

use chrono::NaiveDate;

use crate::types::{Chunk, ChunkDraft, ChunkType};

const DEMO_DIM: usize = 4096;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

#[allow(clippy::too_many_arguments)]
fn demo(id: &str, content: &str, source: &str, chunk_type: ChunkType, ingested_at: NaiveDate, base: f64, rating: f64, reliability: f64) -> Chunk {
    ChunkDraft {
        content: content.to_string(),
        source: source.to_string(),
        chunk_type,
        dimensionality: DEMO_DIM,
        ingested_at,
        base_vector_score: base,
        avg_user_rating: rating,
        source_reliability: reliability,
    }
    .into_chunk(id.to_string())
}

pub fn demo_corpus() -> Vec<Chunk> {
    vec![
        demo(
            "vec_892",
            r#"To reset the printer spooler on Windows Server 2019, stop the spooler service using "net stop spooler" and then delete files in System32\spool\PRINTERS."#,
            "SOP-Win-042",
            ChunkType::Sop,
            date(2023, 11, 12),
            0.92,
            4.8,
            1.0,
        ),
        // Users found this log misleading, hence the low rating.
        demo(
            "vec_104",
            "Network latency on the 3rd floor is often caused by the legacy switch on rack 4. Check uplink saturation.",
            "Incident-Log-2023",
            ChunkType::Log,
            date(2024, 1, 15),
            0.88,
            2.5,
            0.6,
        ),
        demo(
            "vec_331",
            "For VPN connectivity issues, ensure the user has the correct certificate installed in the Personal store.",
            "KB-VPN-001",
            ChunkType::Kb,
            date(2023, 9, 30),
            0.76,
            4.2,
            0.8,
        ),
        demo(
            "vec_002",
            "Password policies require 12 characters minimum. Reset via ADUC or Azure AD portal.",
            "Policy-Sec-01",
            ChunkType::Policy,
            date(2023, 8, 22),
            0.65,
            5.0,
            1.0,
        ),
        demo(
            "vec_551",
            "Error 503 Service Unavailable often correlates with high memory usage on the app pool. Recycle app pool to fix temporarily.",
            "KB-IIS-99",
            ChunkType::Kb,
            date(2024, 2, 10),
            0.72,
            3.5,
            0.7,
        ),
    ]
}
