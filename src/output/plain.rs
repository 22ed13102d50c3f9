//! Plain text output

use crate::stats::{
    RateSample, ReceiverTotals, SenderTotals, bytes_to_human, mbps_to_human,
};

/// Live rate line, e.g. `Sending at 12 Mbit/s (1.50 MB/s)`
pub fn output_rate_plain(verb: &str, sample: &RateSample) -> String {
    format!(
        "{} at {:.0} {}/s ({:.2} {}/s)        ",
        verb,
        sample.megabits().floor(),
        sample.units.bit_label(),
        sample.megabytes(),
        sample.units.byte_label()
    )
}

pub fn output_send_plain(totals: &SenderTotals) -> String {
    let units = totals.units;
    let mut output = String::new();

    output.push_str("--- etherp-send statistics ---\n");
    output.push_str(&format!(
        "{} frames sent, {:.2} {} sent\n",
        totals.frames,
        totals.bytes as f64 / units.mega(),
        units.byte_label()
    ));
    output.push_str(&format!(
        "  Duration:    {:.2}s\n",
        totals.duration_ms as f64 / 1000.0
    ));
    output.push_str(&format!("  Transfer:    {}\n", bytes_to_human(totals.bytes, units)));
    output.push_str(&format!(
        "  Throughput:  {}\n",
        mbps_to_human(totals.throughput_mbps, units)
    ));
    if let Some(peak) = totals.peak_mbps {
        output.push_str(&format!("  Peak:        {}\n", mbps_to_human(peak, units)));
    }
    if let Some(last_id) = totals.last_id {
        output.push_str(&format!("  Last ID:     {}\n", last_id));
    }
    if totals.cancelled {
        output.push_str("  Interrupted, stop frame sent\n");
    }

    output
}

pub fn output_recv_plain(totals: &ReceiverTotals) -> String {
    let units = totals.units;
    let mut output = String::new();

    output.push_str("--- etherp-recv statistics ---\n");
    output.push_str(&format!(
        "{} frames received, {:.2} {} received, {} errors detected\n",
        totals.frames,
        totals.bytes as f64 / units.mega(),
        units.byte_label(),
        totals.errors
    ));
    output.push_str(&format!(
        "  Duration:    {:.2}s\n",
        totals.duration_ms as f64 / 1000.0
    ));
    output.push_str(&format!("  Transfer:    {}\n", bytes_to_human(totals.bytes, units)));
    output.push_str(&format!(
        "  Throughput:  {}\n",
        mbps_to_human(totals.throughput_mbps, units)
    ));
    if let Some(peak) = totals.peak_mbps {
        output.push_str(&format!("  Peak:        {}\n", mbps_to_human(peak, units)));
    }

    let sent = totals.frames + totals.lost;
    let lost_percent = if sent > 0 {
        totals.lost as f64 / sent as f64 * 100.0
    } else {
        0.0
    };
    output.push_str(&format!(
        "  Lost:        {} ({:.2}%)\n",
        totals.lost, lost_percent
    ));
    output.push_str(&format!("  Bad CRC:     {}\n", totals.checksum_errors));
    if totals.truncated > 0 {
        output.push_str(&format!("  Truncated:   {}\n", totals.truncated));
    }
    if totals.backward > 0 {
        output.push_str(&format!("  Out of seq:  {}\n", totals.backward));
    }
    if !totals.completed {
        output.push_str("  Interrupted before the last frame\n");
    }

    output
}
