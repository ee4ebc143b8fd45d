use std::collections::HashMap;

use crate::{FlowSummary, ProtocolType, TransportProtocol};

use super::compliance::endpoint;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub(crate) struct FlowKey {
    pub transport: TransportProtocol,
    pub src_ip: String,
    pub src_port: u16,
    pub dst_ip: String,
    pub dst_port: u16,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct FlowStats {
    pub packets: u64,
    pub bytes: u64,
    pub doip_messages: u64,
    pub uds_messages: u64,
}

impl FlowStats {
    pub(crate) fn add_message(&mut self, protocol: ProtocolType) {
        match protocol {
            ProtocolType::Doip => self.doip_messages += 1,
            ProtocolType::Uds => {
                self.doip_messages += 1;
                self.uds_messages += 1;
            }
            _ => {}
        }
    }
}

pub(crate) fn build_flow_summaries(
    stats: HashMap<FlowKey, FlowStats>,
    duration_s: Option<f64>,
) -> Vec<FlowSummary> {
    let mut flows: Vec<FlowSummary> = stats
        .into_iter()
        .map(|(key, stats)| {
            let (pps, bps) = duration_s
                .map(|d| (stats.packets as f64 / d, stats.bytes as f64 / d))
                .map(|(pps, bps)| (Some(pps), Some(bps)))
                .unwrap_or((None, None));
            let app_proto = if stats.uds_messages > 0 {
                "uds"
            } else if stats.doip_messages > 0 {
                "doip"
            } else {
                key.transport.as_str()
            };

            FlowSummary {
                transport: key.transport.as_str().to_string(),
                app_proto: app_proto.to_string(),
                src: endpoint(&key.src_ip, key.src_port),
                dst: endpoint(&key.dst_ip, key.dst_port),
                packets: stats.packets,
                bytes: stats.bytes,
                doip_messages: stats.doip_messages,
                pps,
                bps,
            }
        })
        .collect();

    flows.sort_by(|a, b| {
        a.src
            .cmp(&b.src)
            .then_with(|| a.dst.cmp(&b.dst))
            .then_with(|| a.transport.cmp(&b.transport))
    });
    flows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(transport: TransportProtocol, src: &str, dst_port: u16) -> FlowKey {
        FlowKey {
            transport,
            src_ip: src.to_string(),
            src_port: 40000,
            dst_ip: "10.0.0.9".to_string(),
            dst_port,
        }
    }

    #[test]
    fn summaries_are_sorted_and_no_duration_means_none_rates() {
        let mut stats = HashMap::new();
        stats.insert(
            key(TransportProtocol::Tcp, "10.0.0.2", 13400),
            FlowStats {
                packets: 10,
                bytes: 100,
                ..FlowStats::default()
            },
        );
        stats.insert(
            key(TransportProtocol::Udp, "10.0.0.1", 13400),
            FlowStats {
                packets: 5,
                bytes: 50,
                ..FlowStats::default()
            },
        );

        let summaries = build_flow_summaries(stats, None);
        assert_eq!(summaries.len(), 2);
        assert!(summaries[0].src < summaries[1].src);
        assert_eq!(summaries[0].transport, "udp");
        assert!(summaries.iter().all(|s| s.pps.is_none() && s.bps.is_none()));
    }

    #[test]
    fn summaries_compute_rates_and_app_proto() {
        let mut stats = HashMap::new();
        let mut flow = FlowStats {
            packets: 10,
            bytes: 100,
            ..FlowStats::default()
        };
        flow.add_message(ProtocolType::Doip);
        flow.add_message(ProtocolType::Tcp);
        stats.insert(key(TransportProtocol::Tcp, "fe80::1", 13400), flow);

        let summaries = build_flow_summaries(stats, Some(2.0));
        let summary = &summaries[0];
        assert_eq!(summary.pps, Some(5.0));
        assert_eq!(summary.bps, Some(50.0));
        assert_eq!(summary.app_proto, "doip");
        assert_eq!(summary.doip_messages, 1);
        assert_eq!(summary.src, "[fe80::1]:40000");
    }
}
