//! Tagged-stream demuxer
//!
//! Routes each inbound buffer to the channel named by its tag byte,
//! activating the channel on first use, and fans inbound control events out
//! to the active channels.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::registry::{Activation, ActivationPlan, Channel, ChannelKind, ChannelRegistry, ChannelState};
use crate::sink::{ChannelItem, ChannelSink, SinkError};
use crate::stats::{DemuxCounters, DemuxStats};

use super::config::{DemuxConfig, FormatDescriptor};
use super::event::{ControlEvent, CustomEvent};
use super::fanout::FanoutReport;
use super::frame::InboundBuffer;

/// Sinks attached to the demuxer outputs
#[derive(Clone, Default)]
pub struct Outputs {
    sinks: [Option<Arc<dyn ChannelSink>>; ChannelKind::COUNT],
}

impl Outputs {
    /// Create an empty set of outputs
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a sink to a channel kind
    pub fn link(mut self, kind: ChannelKind, sink: Arc<dyn ChannelSink>) -> Self {
        self.sinks[kind.index()] = Some(sink);
        self
    }

    /// Attach the control output
    pub fn control(self, sink: Arc<dyn ChannelSink>) -> Self {
        self.link(ChannelKind::Control, sink)
    }

    /// Attach the video output
    pub fn video(self, sink: Arc<dyn ChannelSink>) -> Self {
        self.link(ChannelKind::Video, sink)
    }

    /// Attach the audio output
    pub fn audio(self, sink: Arc<dyn ChannelSink>) -> Self {
        self.link(ChannelKind::Audio, sink)
    }

    /// Get the sink for a channel kind
    pub fn get(&self, kind: ChannelKind) -> Option<&Arc<dyn ChannelSink>> {
        self.sinks[kind.index()].as_ref()
    }

    /// Check if a sink is attached
    pub fn is_linked(&self, kind: ChannelKind) -> bool {
        self.sinks[kind.index()].is_some()
    }
}

/// Demultiplexer splitting one tagged stream into control, video and audio
///
/// Expects a single producer calling `push_buffer` and `push_event`.
/// Administrative calls (`set_format`, `stats`, `stop`) may come from other
/// threads; share it as `Arc<Demuxer>`.
pub struct Demuxer {
    config: DemuxConfig,
    registry: ChannelRegistry,
    outputs: Outputs,
    counters: DemuxCounters,
}

impl Demuxer {
    /// Create a demuxer with an empty registry
    pub fn new(config: DemuxConfig, outputs: Outputs) -> Self {
        let registry = ChannelRegistry::with_formats(config.formats.clone());

        Self {
            config,
            registry,
            outputs,
            counters: DemuxCounters::default(),
        }
    }

    /// Get the configuration the demuxer was created with
    ///
    /// Its formats are the startup values. Changes made with `set_format`
    /// and `clear_format` are read back through `format`.
    pub fn config(&self) -> &DemuxConfig {
        &self.config
    }

    /// Route one inbound buffer
    ///
    /// Returns the channel the payload was forwarded to. On error the buffer
    /// is dropped and the demuxer stays usable.
    pub fn push_buffer(&self, data: Bytes) -> Result<ChannelKind> {
        let inbound = InboundBuffer::parse(data).map_err(|e| {
            self.counters.on_malformed();
            tracing::warn!("Dropping buffer without type tag");
            e
        })?;

        let kind = self.registry.resolve(inbound.tag).map_err(|e| {
            self.counters.on_unsupported();
            tracing::warn!(tag = inbound.tag, "Dropping buffer with unsupported type");
            e
        })?;

        tracing::trace!(kind = %kind, len = inbound.payload.len(), "Routing buffer");

        let sink = self.outputs.get(kind).ok_or_else(|| {
            self.counters.on_failure(kind);
            tracing::warn!(kind = %kind, "No sink linked, dropping buffer");
            Error::ActivationFailure {
                kind,
                source: SinkError::NotLinked,
            }
        })?;

        self.ensure_active(kind, sink.as_ref())?;

        let len = inbound.payload.len();
        sink.deliver(ChannelItem::Buffer(inbound.payload))
            .map_err(|source| self.forward_failed(kind, source))?;

        self.counters.on_buffer(kind, len);
        Ok(kind)
    }

    /// Fan an inbound control event out to the outbound channels
    ///
    /// - Stream start: recorded as the upstream stream id, not forwarded.
    ///   Each channel announces its own stream on activation.
    /// - Segment reset: delivered to every active channel. Dropped, and never
    ///   replayed, when no channel is active.
    /// - Other: delivered to active channels with an output format. Sticky
    ///   ones are remembered for channels activating later.
    pub fn push_event(&self, event: ControlEvent) -> FanoutReport {
        match event {
            ControlEvent::StreamStart { stream_id } => {
                tracing::debug!(stream_id = %stream_id, "Upstream stream start");
                self.registry.set_upstream_stream_id(stream_id);
                FanoutReport::default()
            }
            ControlEvent::SegmentReset(segment) => {
                let targets = self.registry.active_kinds();
                if targets.is_empty() {
                    tracing::debug!("No active channels, dropping segment");
                    self.counters.on_event_dropped();
                    return FanoutReport::default();
                }

                self.fan_out(&targets, ControlEvent::SegmentReset(segment))
            }
            ControlEvent::Other(custom) => {
                if custom.sticky {
                    self.registry.remember_sticky(&custom);
                }

                let targets = self.registry.configured_kinds();
                if targets.is_empty() {
                    tracing::debug!(event = %custom.name, "No configured channels, dropping event");
                    self.counters.on_event_dropped();
                    return FanoutReport::default();
                }

                self.fan_out(&targets, ControlEvent::Other(custom))
            }
        }
    }

    /// Set the format descriptor for a channel kind
    ///
    /// Takes effect for channels that have not delivered a format yet.
    pub fn set_format(&self, kind: ChannelKind, format: impl Into<FormatDescriptor>) {
        self.registry.set_format(kind, Some(format.into()));
    }

    /// Clear the format descriptor for a channel kind
    pub fn clear_format(&self, kind: ChannelKind) {
        self.registry.set_format(kind, None);
    }

    /// Get the format descriptor for a channel kind, as last set
    pub fn format(&self, kind: ChannelKind) -> Option<FormatDescriptor> {
        self.registry.format(kind)
    }

    /// Get the activation state of a channel
    pub fn channel_state(&self, kind: ChannelKind) -> ChannelState {
        self.registry.state(kind)
    }

    /// Kinds of the active channels, in kind order
    pub fn active_channels(&self) -> Vec<ChannelKind> {
        self.registry.active_kinds()
    }

    /// Invoke `f` for every active channel, under the registry lock
    ///
    /// `f` must not call back into the demuxer.
    pub fn for_each_active<F>(&self, f: F)
    where
        F: FnMut(&Channel),
    {
        self.registry.for_each_active(f);
    }

    /// Identifier announced by the upstream stream start, if any
    pub fn upstream_stream_id(&self) -> Option<String> {
        self.registry.upstream_stream_id()
    }

    /// Get a statistics snapshot
    pub fn stats(&self) -> DemuxStats {
        self.counters.snapshot(|kind| match self.registry.channel(kind) {
            Some(channel) => (channel.state, channel.active_duration()),
            None => (ChannelState::Inactive, None),
        })
    }

    /// Tear down every channel
    ///
    /// Call after the producer has stopped. Format descriptors are kept;
    /// a buffer pushed afterwards activates its channel afresh.
    pub fn stop(&self) {
        let removed = self.registry.teardown();

        for kind in &removed {
            if let Some(sink) = self.outputs.get(*kind) {
                sink.deactivate();
            }
        }

        if !removed.is_empty() {
            tracing::info!(channels = removed.len(), "Demuxer stopped, channels released");
        }
    }

    fn ensure_active(&self, kind: ChannelKind, sink: &dyn ChannelSink) -> Result<()> {
        match self.registry.get_or_activate(kind) {
            Activation::Ready {
                pending_format: None,
                ..
            } => Ok(()),
            Activation::Ready {
                pending_format: Some(format),
                sticky,
            } => self.configure(kind, sink, format, &sticky),
            Activation::Pending(plan) => self.activate(sink, plan),
        }
    }

    /// Deliver a late format, then the sticky events, to an active channel
    ///
    /// This is the channel's first configuration, so a rejection is an
    /// activation failure. The channel stays unconfigured and the next
    /// buffer retries.
    fn configure(
        &self,
        kind: ChannelKind,
        sink: &dyn ChannelSink,
        format: FormatDescriptor,
        sticky: &[CustomEvent],
    ) -> Result<()> {
        let replayed = match self.deliver_configuration(kind, sink, &format, sticky) {
            Ok(replayed) => replayed,
            Err(source) => {
                self.counters.on_failure(kind);
                tracing::warn!(kind = %kind, error = %source, "Channel configuration failed");
                return Err(Error::ActivationFailure { kind, source });
            }
        };

        self.registry.mark_configured(kind, format);

        tracing::info!(kind = %kind, replayed = replayed, "Channel configured");
        Ok(())
    }

    fn activate(&self, sink: &dyn ChannelSink, plan: ActivationPlan) -> Result<()> {
        let kind = plan.kind;

        let replayed = match self.deliver_activation(sink, &plan) {
            Ok(replayed) => replayed,
            Err(source) => {
                self.registry.abort_activation(kind);
                self.counters.on_failure(kind);
                tracing::warn!(kind = %kind, error = %source, "Channel activation failed");
                return Err(Error::ActivationFailure { kind, source });
            }
        };

        let configured = plan.format.is_some();
        self.registry.complete_activation(kind, plan.format);
        self.counters.on_activation(kind);

        tracing::info!(
            kind = %kind,
            stream_id = %plan.stream_id,
            configured = configured,
            replayed = replayed,
            "Channel activated"
        );

        Ok(())
    }

    /// Deliver stream start, format and sticky events to a new channel
    ///
    /// Returns the number of replayed sticky events.
    fn deliver_activation(
        &self,
        sink: &dyn ChannelSink,
        plan: &ActivationPlan,
    ) -> std::result::Result<usize, SinkError> {
        sink.deliver(ChannelItem::Event(ControlEvent::stream_start(
            plan.stream_id.clone(),
        )))?;
        self.counters.on_event(plan.kind);

        let Some(format) = &plan.format else {
            tracing::debug!(kind = %plan.kind, "No format set, channel left unconfigured");
            return Ok(0);
        };

        self.deliver_configuration(plan.kind, sink, format, &plan.sticky)
    }

    /// Deliver a format followed by the sticky events, if replay is enabled
    ///
    /// Returns the number of replayed sticky events.
    fn deliver_configuration(
        &self,
        kind: ChannelKind,
        sink: &dyn ChannelSink,
        format: &FormatDescriptor,
        sticky: &[CustomEvent],
    ) -> std::result::Result<usize, SinkError> {
        sink.deliver(ChannelItem::Format(format.clone()))?;

        if !self.config.replay_sticky_events {
            return Ok(0);
        }

        for event in sticky {
            sink.deliver(ChannelItem::Event(ControlEvent::Other(event.clone())))?;
            self.counters.on_event(kind);
        }

        Ok(sticky.len())
    }

    fn fan_out(&self, targets: &[ChannelKind], event: ControlEvent) -> FanoutReport {
        let mut report = FanoutReport::default();

        for &kind in targets {
            let Some(sink) = self.outputs.get(kind) else {
                continue;
            };

            match sink.deliver(ChannelItem::Event(event.clone())) {
                Ok(()) => {
                    self.counters.on_event(kind);
                    report.record_delivered(kind);
                }
                Err(source) => {
                    self.counters.on_failure(kind);
                    tracing::warn!(
                        kind = %kind,
                        event = event.name(),
                        error = %source,
                        "Event delivery failed"
                    );
                    report.record_failure(kind, source);
                }
            }
        }

        tracing::debug!(
            event = event.name(),
            delivered = report.delivered().len(),
            failed = report.failures().len(),
            "Event fanned out"
        );

        report
    }

    fn forward_failed(&self, kind: ChannelKind, source: SinkError) -> Error {
        self.counters.on_failure(kind);
        tracing::warn!(kind = %kind, error = %source, "Forward failed");
        Error::ForwardFailure { kind, source }
    }
}

impl Drop for Demuxer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::demux::event::Segment;
    use crate::sink::testing::RecordingSink;

    struct Harness {
        demuxer: Demuxer,
        control: Arc<RecordingSink>,
        video: Arc<RecordingSink>,
        audio: Arc<RecordingSink>,
    }

    fn harness(config: DemuxConfig) -> Harness {
        let control = RecordingSink::new();
        let video = RecordingSink::new();
        let audio = RecordingSink::new();

        let outputs = Outputs::new()
            .control(control.clone())
            .video(video.clone())
            .audio(audio.clone());

        Harness {
            demuxer: Demuxer::new(config, outputs),
            control,
            video,
            audio,
        }
    }

    fn configured() -> DemuxConfig {
        DemuxConfig::default()
            .control_format("application/x-rtcp")
            .video_format("video/x-h264")
            .audio_format("audio/x-opus")
    }

    fn tagged(tag: u8, payload: &[u8]) -> Bytes {
        let mut data = vec![tag];
        data.extend_from_slice(payload);
        Bytes::from(data)
    }

    fn stream_start(id: &str) -> ChannelItem {
        ChannelItem::Event(ControlEvent::stream_start(id))
    }

    fn format(f: &'static str) -> ChannelItem {
        ChannelItem::Format(FormatDescriptor::from(f))
    }

    fn buffer(b: &[u8]) -> ChannelItem {
        ChannelItem::Buffer(Bytes::copy_from_slice(b))
    }

    #[test]
    fn test_routes_payload_without_tag() {
        let h = harness(configured());

        assert_eq!(
            h.demuxer.push_buffer(tagged(1, &[0xAA, 0xBB])).unwrap(),
            ChannelKind::Video
        );

        assert_eq!(h.video.buffers(), vec![Bytes::from_static(&[0xAA, 0xBB])]);
        assert!(h.control.items().is_empty());
        assert!(h.audio.items().is_empty());
    }

    #[test]
    fn test_each_tag_reaches_its_channel() {
        let h = harness(configured());

        h.demuxer.push_buffer(tagged(0, b"ctrl")).unwrap();
        h.demuxer.push_buffer(tagged(1, b"vid")).unwrap();
        h.demuxer.push_buffer(tagged(2, b"aud")).unwrap();

        assert_eq!(h.control.buffers(), vec![Bytes::from_static(b"ctrl")]);
        assert_eq!(h.video.buffers(), vec![Bytes::from_static(b"vid")]);
        assert_eq!(h.audio.buffers(), vec![Bytes::from_static(b"aud")]);
    }

    #[test]
    fn test_first_buffer_preceded_by_stream_start_and_format() {
        let h = harness(configured());

        for _ in 0..5 {
            h.demuxer.push_buffer(tagged(0, b"c")).unwrap();
        }
        h.demuxer.push_buffer(tagged(1, b"v")).unwrap();

        assert_eq!(
            h.video.items(),
            vec![stream_start("video-1"), format("video/x-h264"), buffer(b"v")]
        );
        assert_eq!(h.control.items()[0], stream_start("control-0"));
        assert_eq!(h.control.items()[1], format("application/x-rtcp"));
    }

    #[test]
    fn test_second_buffer_forwards_only_payload() {
        let h = harness(configured());

        h.demuxer.push_buffer(tagged(2, b"one")).unwrap();
        h.demuxer.push_buffer(tagged(2, b"two")).unwrap();

        assert_eq!(
            h.audio.items(),
            vec![
                stream_start("audio-2"),
                format("audio/x-opus"),
                buffer(b"one"),
                buffer(b"two"),
            ]
        );
        assert_eq!(h.demuxer.stats().channel(ChannelKind::Audio).activations, 1);
    }

    #[test]
    fn test_tag_only_buffer_forwards_empty_payload() {
        let h = harness(configured());

        h.demuxer.push_buffer(Bytes::from_static(&[1])).unwrap();

        assert_eq!(h.video.buffers(), vec![Bytes::new()]);
    }

    #[test]
    fn test_empty_buffer_is_malformed() {
        let h = harness(configured());

        let result = h.demuxer.push_buffer(Bytes::new());

        assert!(matches!(result, Err(Error::MalformedInput)));
        assert_eq!(h.demuxer.stats().malformed, 1);
        assert!(h.demuxer.active_channels().is_empty());
    }

    #[test]
    fn test_unsupported_tag_has_no_effect() {
        let h = harness(configured());
        h.demuxer.push_buffer(tagged(1, b"v")).unwrap();
        let video_before = h.video.items().len();

        for tag in [3u8, 4, 0x7F, 0xFF] {
            let result = h.demuxer.push_buffer(tagged(tag, b"x"));
            assert!(matches!(result, Err(Error::UnsupportedType(t)) if t == tag));
        }

        assert!(h.control.items().is_empty());
        assert!(h.audio.items().is_empty());
        assert_eq!(h.video.items().len(), video_before);
        assert_eq!(h.demuxer.channel_state(ChannelKind::Control), ChannelState::Inactive);
        assert_eq!(h.demuxer.channel_state(ChannelKind::Video), ChannelState::Active);
        assert_eq!(h.demuxer.channel_state(ChannelKind::Audio), ChannelState::Inactive);
        assert_eq!(h.demuxer.stats().unsupported, 4);

        // Still usable afterwards
        h.demuxer.push_buffer(tagged(2, b"a")).unwrap();
        assert_eq!(h.audio.buffers(), vec![Bytes::from_static(b"a")]);
    }

    #[test]
    fn test_segment_with_no_active_channels_is_dropped() {
        let h = harness(configured());

        let report = h.demuxer.push_event(ControlEvent::SegmentReset(Segment::new(0)));
        assert!(report.is_dropped());

        h.demuxer.push_buffer(tagged(1, b"v")).unwrap();

        // Not retried on later activation
        assert_eq!(
            h.video.items(),
            vec![stream_start("video-1"), format("video/x-h264"), buffer(b"v")]
        );
        assert_eq!(h.demuxer.stats().events_dropped, 1);
    }

    #[test]
    fn test_segment_reaches_exactly_active_channels() {
        let h = harness(configured());
        h.demuxer.push_buffer(tagged(1, b"v")).unwrap();
        h.demuxer.push_buffer(tagged(2, b"a")).unwrap();

        let segment = Segment::new(1_000);
        let report = h.demuxer.push_event(ControlEvent::SegmentReset(segment));

        assert_eq!(report.delivered(), &[ChannelKind::Video, ChannelKind::Audio]);
        assert!(report.is_complete());
        assert!(h.control.items().is_empty());

        let expected = ChannelItem::Event(ControlEvent::SegmentReset(segment));
        assert_eq!(h.video.items().last(), Some(&expected));
        assert_eq!(h.audio.items().last(), Some(&expected));
    }

    #[test]
    fn test_segment_before_activation_not_replayed() {
        let h = harness(configured());
        h.demuxer.push_buffer(tagged(1, b"v")).unwrap();
        h.demuxer.push_event(ControlEvent::SegmentReset(Segment::new(5)));

        h.demuxer.push_buffer(tagged(2, b"a")).unwrap();

        assert_eq!(
            h.audio.items(),
            vec![stream_start("audio-2"), format("audio/x-opus"), buffer(b"a")]
        );
    }

    #[test]
    fn test_fanout_is_best_effort() {
        let h = harness(configured());
        for tag in 0..3 {
            h.demuxer.push_buffer(tagged(tag, b"x")).unwrap();
        }
        h.video.fail_next(1);

        let report = h.demuxer.push_event(ControlEvent::SegmentReset(Segment::default()));

        assert_eq!(report.delivered(), &[ChannelKind::Control, ChannelKind::Audio]);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].0, ChannelKind::Video);
        assert!(matches!(
            report.into_result(),
            Err(Error::ForwardFailure {
                kind: ChannelKind::Video,
                ..
            })
        ));
    }

    #[test]
    fn test_activation_failure_leaves_channel_inactive() {
        let h = harness(configured());
        h.video.fail_next(1);

        let result = h.demuxer.push_buffer(tagged(1, b"first"));

        assert!(matches!(
            result,
            Err(Error::ActivationFailure {
                kind: ChannelKind::Video,
                ..
            })
        ));
        assert_eq!(h.demuxer.channel_state(ChannelKind::Video), ChannelState::Inactive);
        assert!(h.video.items().is_empty());

        // A later buffer retries activation from scratch
        h.demuxer.push_buffer(tagged(1, b"second")).unwrap();
        assert_eq!(
            h.video.items(),
            vec![stream_start("video-1"), format("video/x-h264"), buffer(b"second")]
        );
    }

    #[test]
    fn test_activation_failure_on_format() {
        let rejecting = |item: ChannelItem| -> std::result::Result<(), SinkError> {
            match item {
                ChannelItem::Format(_) => Err(SinkError::Rejected("format not accepted".into())),
                _ => Ok(()),
            }
        };
        let demuxer = Demuxer::new(configured(), Outputs::new().audio(Arc::new(rejecting)));

        let result = demuxer.push_buffer(tagged(2, b"a"));

        assert!(matches!(
            result,
            Err(Error::ActivationFailure {
                kind: ChannelKind::Audio,
                source: SinkError::Rejected(_)
            })
        ));
        assert_eq!(demuxer.channel_state(ChannelKind::Audio), ChannelState::Inactive);
        assert_eq!(demuxer.stats().channel(ChannelKind::Audio).activations, 0);
    }

    #[test]
    fn test_forward_failure_keeps_channel_active() {
        let h = harness(configured());
        h.video.reject_buffers(true);

        let result = h.demuxer.push_buffer(tagged(1, b"v"));

        assert!(matches!(
            result,
            Err(Error::ForwardFailure {
                kind: ChannelKind::Video,
                source: SinkError::Full
            })
        ));
        assert_eq!(h.demuxer.channel_state(ChannelKind::Video), ChannelState::Active);

        h.video.reject_buffers(false);
        h.demuxer.push_buffer(tagged(1, b"w")).unwrap();

        assert_eq!(
            h.video.items(),
            vec![stream_start("video-1"), format("video/x-h264"), buffer(b"w")]
        );
        assert_eq!(h.demuxer.stats().channel(ChannelKind::Video).failures, 1);
    }

    #[test]
    fn test_unlinked_output_fails_activation() {
        let video = RecordingSink::new();
        let demuxer = Demuxer::new(configured(), Outputs::new().video(video.clone()));

        let result = demuxer.push_buffer(tagged(2, b"a"));

        assert!(matches!(
            result,
            Err(Error::ActivationFailure {
                kind: ChannelKind::Audio,
                source: SinkError::NotLinked
            })
        ));
        assert_eq!(demuxer.channel_state(ChannelKind::Audio), ChannelState::Inactive);
        demuxer.push_buffer(tagged(1, b"v")).unwrap();
        assert_eq!(video.buffers().len(), 1);
    }

    #[test]
    fn test_sticky_event_replayed_on_activation() {
        let h = harness(configured());
        h.demuxer.push_buffer(tagged(1, b"v")).unwrap();

        let tags = CustomEvent::sticky("tags", Bytes::from_static(b"title=demo"));
        let report = h.demuxer.push_event(ControlEvent::Other(tags.clone()));
        assert_eq!(report.delivered(), &[ChannelKind::Video]);

        h.demuxer.push_buffer(tagged(2, b"a")).unwrap();

        assert_eq!(
            h.audio.items(),
            vec![
                stream_start("audio-2"),
                format("audio/x-opus"),
                ChannelItem::Event(ControlEvent::Other(tags)),
                buffer(b"a"),
            ]
        );
    }

    #[test]
    fn test_sticky_event_before_any_activation() {
        let h = harness(configured());

        let tags = CustomEvent::sticky("tags", Bytes::from_static(b"t"));
        let report = h.demuxer.push_event(ControlEvent::Other(tags.clone()));
        assert!(report.is_dropped());

        h.demuxer.push_buffer(tagged(0, b"c")).unwrap();

        assert_eq!(
            h.control.items()[2],
            ChannelItem::Event(ControlEvent::Other(tags))
        );
    }

    #[test]
    fn test_sticky_replay_disabled() {
        let h = harness(configured().disable_sticky_replay());
        h.demuxer
            .push_event(ControlEvent::Other(CustomEvent::sticky("tags", Bytes::new())));

        h.demuxer.push_buffer(tagged(1, b"v")).unwrap();

        assert_eq!(
            h.video.items(),
            vec![stream_start("video-1"), format("video/x-h264"), buffer(b"v")]
        );
    }

    #[test]
    fn test_non_sticky_event_not_replayed() {
        let h = harness(configured());
        h.demuxer
            .push_event(ControlEvent::Other(CustomEvent::new("qos", Bytes::new())));

        h.demuxer.push_buffer(tagged(1, b"v")).unwrap();

        assert_eq!(h.video.items().len(), 3);
        assert_eq!(h.demuxer.stats().events_dropped, 1);
    }

    #[test]
    fn test_other_event_skips_unconfigured_channel() {
        let h = harness(DemuxConfig::default().video_format("video/x-h264"));
        h.demuxer.push_buffer(tagged(1, b"v")).unwrap();
        h.demuxer.push_buffer(tagged(2, b"a")).unwrap();

        let report = h
            .demuxer
            .push_event(ControlEvent::Other(CustomEvent::new("qos", Bytes::new())));

        assert_eq!(report.delivered(), &[ChannelKind::Video]);
        assert_eq!(h.audio.items(), vec![stream_start("audio-2"), buffer(b"a")]);

        // Segment resets still reach the unconfigured channel
        let report = h.demuxer.push_event(ControlEvent::SegmentReset(Segment::default()));
        assert_eq!(report.delivered(), &[ChannelKind::Video, ChannelKind::Audio]);
    }

    #[test]
    fn test_late_format_delivered_once() {
        let h = harness(DemuxConfig::default());
        h.demuxer.push_buffer(tagged(2, b"1")).unwrap();

        h.demuxer.set_format(ChannelKind::Audio, "audio/x-opus");
        h.demuxer.push_buffer(tagged(2, b"2")).unwrap();
        h.demuxer.set_format(ChannelKind::Audio, "audio/mpeg");
        h.demuxer.push_buffer(tagged(2, b"3")).unwrap();

        assert_eq!(
            h.audio.items(),
            vec![
                stream_start("audio-2"),
                buffer(b"1"),
                format("audio/x-opus"),
                buffer(b"2"),
                buffer(b"3"),
            ]
        );
        assert_eq!(
            h.demuxer.format(ChannelKind::Audio),
            Some(FormatDescriptor::from("audio/mpeg"))
        );
    }

    #[test]
    fn test_sticky_replayed_after_late_format() {
        let h = harness(DemuxConfig::default());
        let tags = CustomEvent::sticky("tags", Bytes::from_static(b"title=live"));

        h.demuxer.push_event(ControlEvent::Other(tags.clone()));
        h.demuxer.push_buffer(tagged(2, b"1")).unwrap();
        h.demuxer.set_format(ChannelKind::Audio, "audio/x-opus");
        h.demuxer.push_buffer(tagged(2, b"2")).unwrap();
        h.demuxer.push_buffer(tagged(2, b"3")).unwrap();

        assert_eq!(
            h.audio.items(),
            vec![
                stream_start("audio-2"),
                buffer(b"1"),
                format("audio/x-opus"),
                ChannelItem::Event(ControlEvent::Other(tags)),
                buffer(b"2"),
                buffer(b"3"),
            ]
        );
    }

    #[test]
    fn test_late_format_honors_replay_toggle() {
        let h = harness(DemuxConfig::default().disable_sticky_replay());

        h.demuxer
            .push_event(ControlEvent::Other(CustomEvent::sticky("tags", Bytes::new())));
        h.demuxer.push_buffer(tagged(1, b"1")).unwrap();
        h.demuxer.set_format(ChannelKind::Video, "video/x-h264");
        h.demuxer.push_buffer(tagged(1, b"2")).unwrap();

        assert_eq!(
            h.video.items(),
            vec![
                stream_start("video-1"),
                buffer(b"1"),
                format("video/x-h264"),
                buffer(b"2"),
            ]
        );
    }

    #[test]
    fn test_rejected_late_format_is_activation_failure() {
        let h = harness(DemuxConfig::default());
        h.demuxer.push_buffer(tagged(2, b"1")).unwrap();
        h.demuxer.set_format(ChannelKind::Audio, "audio/x-opus");

        h.audio.fail_next(1);
        let err = h.demuxer.push_buffer(tagged(2, b"2")).unwrap_err();

        assert!(matches!(
            err,
            Error::ActivationFailure {
                kind: ChannelKind::Audio,
                source: SinkError::Rejected(_)
            }
        ));
        assert_eq!(h.demuxer.channel_state(ChannelKind::Audio), ChannelState::Active);

        // The next buffer retries the configuration
        h.demuxer.push_buffer(tagged(2, b"3")).unwrap();
        assert_eq!(
            h.audio.items(),
            vec![
                stream_start("audio-2"),
                buffer(b"1"),
                format("audio/x-opus"),
                buffer(b"3"),
            ]
        );
        assert_eq!(h.demuxer.stats().channel(ChannelKind::Audio).failures, 1);
    }

    #[test]
    fn test_config_keeps_startup_formats() {
        let h = harness(configured());

        h.demuxer.set_format(ChannelKind::Video, "video/x-vp8");
        h.demuxer.clear_format(ChannelKind::Audio);

        assert_eq!(
            h.demuxer.config().format_for(ChannelKind::Video),
            Some(&FormatDescriptor::from("video/x-h264"))
        );
        assert_eq!(
            h.demuxer.format(ChannelKind::Video),
            Some(FormatDescriptor::from("video/x-vp8"))
        );
        assert!(h.demuxer.config().format_for(ChannelKind::Audio).is_some());
        assert!(h.demuxer.format(ChannelKind::Audio).is_none());
    }

    #[test]
    fn test_format_read_back_verbatim() {
        let h = harness(DemuxConfig::default());
        let blob = vec![0x00, 0xFF, 0x10, 0x80];

        h.demuxer.set_format(ChannelKind::Control, blob.clone());

        assert_eq!(
            h.demuxer.format(ChannelKind::Control).map(|f| f.as_bytes().to_vec()),
            Some(blob)
        );
        assert!(h.demuxer.format(ChannelKind::Video).is_none());

        h.demuxer.clear_format(ChannelKind::Control);
        assert!(h.demuxer.format(ChannelKind::Control).is_none());
    }

    #[test]
    fn test_upstream_stream_start_not_forwarded() {
        let h = harness(configured());
        h.demuxer.push_buffer(tagged(1, b"v")).unwrap();

        let report = h.demuxer.push_event(ControlEvent::stream_start("udpsrc-0"));

        assert!(report.is_dropped());
        assert_eq!(h.demuxer.upstream_stream_id().as_deref(), Some("udpsrc-0"));
        assert_eq!(h.video.items().len(), 3);
    }

    #[test]
    fn test_for_each_active() {
        let h = harness(configured());
        h.demuxer.push_buffer(tagged(2, b"a")).unwrap();
        h.demuxer.push_buffer(tagged(0, b"c")).unwrap();

        let mut seen = Vec::new();
        h.demuxer.for_each_active(|c| seen.push((c.kind, c.is_configured())));

        assert_eq!(
            seen,
            vec![(ChannelKind::Control, true), (ChannelKind::Audio, true)]
        );
    }

    #[test]
    fn test_stop_tears_down_channels() {
        let h = harness(configured());
        h.demuxer.push_buffer(tagged(0, b"c")).unwrap();
        h.demuxer.push_buffer(tagged(1, b"v")).unwrap();

        h.demuxer.stop();

        assert!(h.control.is_deactivated());
        assert!(h.video.is_deactivated());
        assert!(!h.audio.is_deactivated());
        assert!(h.demuxer.active_channels().is_empty());
        assert_eq!(
            h.demuxer.format(ChannelKind::Video),
            Some(FormatDescriptor::from("video/x-h264"))
        );

        // Restart activates afresh
        h.demuxer.push_buffer(tagged(1, b"again")).unwrap();
        let items = h.video.items();
        assert_eq!(items[items.len() - 3], stream_start("video-1"));
        assert_eq!(items[items.len() - 1], buffer(b"again"));
    }

    #[test]
    fn test_drop_deactivates_sinks() {
        let h = harness(configured());
        h.demuxer.push_buffer(tagged(2, b"a")).unwrap();
        let audio = h.audio.clone();

        drop(h);

        assert!(audio.is_deactivated());
    }

    #[test]
    fn test_stats() {
        let h = harness(configured());
        h.demuxer.push_buffer(tagged(1, &[0u8; 100])).unwrap();
        h.demuxer.push_buffer(tagged(1, &[0u8; 50])).unwrap();
        h.demuxer.push_buffer(tagged(9, b"x")).ok();
        h.demuxer.push_buffer(Bytes::new()).ok();

        let stats = h.demuxer.stats();
        let video = stats.channel(ChannelKind::Video);

        assert_eq!(video.state, ChannelState::Active);
        assert_eq!(video.buffers, 2);
        assert_eq!(video.bytes, 150);
        assert_eq!(video.events, 1);
        assert_eq!(stats.rejected(), 2);
        assert_eq!(stats.channel(ChannelKind::Control).state, ChannelState::Inactive);
        assert!(video.active_for.is_some());
        assert!(stats.channel(ChannelKind::Control).active_for.is_none());
    }

    #[test]
    fn test_shared_across_threads() {
        let h = harness(configured());
        let demuxer = Arc::new(h.demuxer);

        let admin = {
            let demuxer = Arc::clone(&demuxer);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let _ = demuxer.stats();
                    let _ = demuxer.active_channels();
                }
            })
        };

        for i in 0..100u8 {
            demuxer.push_buffer(tagged(i % 3, &[i])).unwrap();
        }
        admin.join().unwrap();

        assert_eq!(demuxer.stats().total_buffers(), 100);
        assert_eq!(h.video.buffers().len(), 33);
    }
}
