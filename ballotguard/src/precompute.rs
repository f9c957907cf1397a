//! Precomputed exponentiations for the encryption hot path.
//!
//! A [`PrecomputeBuffer`] runs one background worker that fills two bounded queues against
//! a fixed public key: bundles of two [`Triple`]s and a [`Quadruple`] (one per selection
//! encryption) and standalone triples (contest proofs, extended data). Consumers pop under
//! the same lock the worker pushes under, so no value is ever handed out twice. When a
//! queue is empty the caller generates the value itself.

use crate::group::*;
use crate::Error;
use log::{debug, error, info};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Default depth of the bundle queue. The triple queue holds twice as many.
pub const DEFAULT_PRECOMPUTE_SIZE: usize = 5000;

/// `(exp, g^exp, K^exp)`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Triple {
    exp: ElementModQ,
    g_to_exp: ElementModP,
    pubkey_to_exp: ElementModP,
}

impl Triple {
    /// Sample a fresh exponent and precompute its powers
    pub fn generate(public_key: &ElementModP) -> Self {
        Triple::from_exponent(rand_q(), public_key)
    }

    pub fn from_exponent(exp: ElementModQ, public_key: &ElementModP) -> Self {
        let g_to_exp = g_pow_p(&exp);
        let pubkey_to_exp = pow_mod_p(public_key, &exp);
        Triple {
            exp,
            g_to_exp,
            pubkey_to_exp,
        }
    }

    pub fn exp(&self) -> &ElementModQ {
        &self.exp
    }

    pub fn g_to_exp(&self) -> &ElementModP {
        &self.g_to_exp
    }

    pub fn pubkey_to_exp(&self) -> &ElementModP {
        &self.pubkey_to_exp
    }
}

/// `(exp1, exp2, g^exp1, g^exp2 * K^exp1)`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quadruple {
    exp1: ElementModQ,
    exp2: ElementModQ,
    g_to_exp1: ElementModP,
    g_to_exp2_mult_by_pubkey_to_exp1: ElementModP,
}

impl Quadruple {
    pub fn generate(public_key: &ElementModP) -> Self {
        Quadruple::from_exponents(rand_q(), rand_q(), public_key)
    }

    pub fn from_exponents(exp1: ElementModQ, exp2: ElementModQ, public_key: &ElementModP) -> Self {
        let g_to_exp1 = g_pow_p(&exp1);
        let g_to_exp2_mult_by_pubkey_to_exp1 =
            mult_mod_p(&g_pow_p(&exp2), &pow_mod_p(public_key, &exp1));
        Quadruple {
            exp1,
            exp2,
            g_to_exp1,
            g_to_exp2_mult_by_pubkey_to_exp1,
        }
    }

    pub fn exp1(&self) -> &ElementModQ {
        &self.exp1
    }

    pub fn exp2(&self) -> &ElementModQ {
        &self.exp2
    }

    pub fn g_to_exp1(&self) -> &ElementModP {
        &self.g_to_exp1
    }

    pub fn g_to_exp2_mult_by_pubkey_to_exp1(&self) -> &ElementModP {
        &self.g_to_exp2_mult_by_pubkey_to_exp1
    }
}

/// Everything one selection encryption consumes: the ciphertext triple, the real proof
/// branch triple, and the simulated proof branch quadruple.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TwoTriplesAndAQuadruple {
    triple1: Triple,
    triple2: Triple,
    quad: Quadruple,
}

impl TwoTriplesAndAQuadruple {
    pub fn new(triple1: Triple, triple2: Triple, quad: Quadruple) -> Self {
        TwoTriplesAndAQuadruple {
            triple1,
            triple2,
            quad,
        }
    }

    pub fn generate(public_key: &ElementModP) -> Self {
        TwoTriplesAndAQuadruple::new(
            Triple::generate(public_key),
            Triple::generate(public_key),
            Quadruple::generate(public_key),
        )
    }

    pub fn triple1(&self) -> &Triple {
        &self.triple1
    }

    pub fn triple2(&self) -> &Triple {
        &self.triple2
    }

    pub fn quad(&self) -> &Quadruple {
        &self.quad
    }

    pub fn into_parts(self) -> (Triple, Triple, Quadruple) {
        (self.triple1, self.triple2, self.quad)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrecomputeStatus {
    /// Never populated
    Idle,
    Running,
    Stopped,
    /// The worker died; the message is the panic payload
    Failed(String),
}

struct Queues {
    max_size: usize,
    public_key: Option<ElementModP>,
    bundles: VecDeque<TwoTriplesAndAQuadruple>,
    triples: VecDeque<Triple>,
    status: PrecomputeStatus,
}

impl Queues {
    fn is_full(&self) -> bool {
        let (bundle, triples) = self.shortfall();
        !bundle && triples == 0
    }

    fn max_triples(&self) -> usize {
        self.max_size * 2
    }

    /// Whether a bundle fits, and how many triples (at most two) fit, in one fill round
    fn shortfall(&self) -> (bool, usize) {
        let bundle = self.bundles.len() < self.max_size;
        let triples = self.max_triples().saturating_sub(self.triples.len()).min(2);
        (bundle, triples)
    }

    fn clear(&mut self) {
        self.bundles.clear();
        self.triples.clear();
    }
}

struct Shared {
    queues: Mutex<Queues>,
    space_available: Condvar,
    stop: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<Queues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// A bounded store of precomputed [`TwoTriplesAndAQuadruple`] bundles and [`Triple`]s,
/// refilled by a background worker.
///
/// Every queued value was generated against the public key most recently passed to
/// [`populate`](PrecomputeBuffer::populate); switching keys discards everything queued.
///
/// ```no_run
/// use ballotguard::*;
///
/// let keypair = ElGamalKeyPair::from_secret(ElementModQ::from(12345)).unwrap();
/// let buffer = PrecomputeBuffer::new();
/// buffer.init(100).unwrap();
/// buffer.populate(keypair.public_key()).unwrap();
///
/// let bundle = buffer.get_two_triples_and_a_quadruple().unwrap();
/// buffer.stop_populate();
/// ```
pub struct PrecomputeBuffer {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for PrecomputeBuffer {
    fn default() -> Self {
        PrecomputeBuffer::new()
    }
}

impl PrecomputeBuffer {
    pub fn new() -> Self {
        PrecomputeBuffer::with_max_queue_size(DEFAULT_PRECOMPUTE_SIZE)
    }

    /// Create a buffer with the given bundle queue depth (`0` selects the default)
    pub fn with_max_queue_size(max_size: usize) -> Self {
        let queues = Queues {
            max_size: queue_size(max_size),
            public_key: None,
            bundles: VecDeque::new(),
            triples: VecDeque::new(),
            status: PrecomputeStatus::Idle,
        };

        PrecomputeBuffer {
            shared: Arc::new(Shared {
                queues: Mutex::new(queues),
                space_available: Condvar::new(),
                stop: AtomicBool::new(false),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Set the bundle queue depth (`0` selects the default). Fails while the worker runs.
    pub fn init(&self, max_size: usize) -> Result<(), Error> {
        let mut queues = self.shared.lock();
        if queues.status == PrecomputeStatus::Running {
            return Err(Error::PrecomputeRunning);
        }

        queues.max_size = queue_size(max_size);
        let (bundle_max, triple_max) = (queues.max_size, queues.max_triples());
        queues.bundles.truncate(bundle_max);
        queues.triples.truncate(triple_max);
        Ok(())
    }

    /// Start filling the queues against `public_key`.
    ///
    /// A no-op if the worker is already running against the same key. Against a different
    /// key the running worker is stopped and joined and the queues are emptied first.
    pub fn populate(&self, public_key: &ElementModP) -> Result<(), Error> {
        if !public_key.is_valid_residue() {
            return Err(Error::InvalidPublicKey);
        }

        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let queues = self.shared.lock();
            if queues.status == PrecomputeStatus::Running
                && queues.public_key.as_ref() == Some(public_key)
            {
                return Ok(());
            }
        }

        if let Some(handle) = worker.take() {
            self.stop_populate();
            join_worker(handle);
        }

        {
            let mut queues = self.shared.lock();
            if queues.public_key.as_ref() != Some(public_key) {
                if !queues.bundles.is_empty() || !queues.triples.is_empty() {
                    info!("precompute public key changed, discarding queued values");
                }
                queues.clear();
                queues.public_key = Some(public_key.clone());
            }
            queues.status = PrecomputeStatus::Running;
            self.shared.stop.store(false, Ordering::SeqCst);
        }

        let shared = self.shared.clone();
        let key = public_key.clone();
        let spawned = thread::Builder::new()
            .name("ballotguard-precompute".to_string())
            .spawn(move || run_worker(shared, key));

        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                let mut queues = self.shared.lock();
                queues.status = PrecomputeStatus::Failed(e.to_string());
                Err(Error::PrecomputeSpawn(e))
            }
        }
    }

    /// Ask the worker to stop after its current bundle. Returns immediately.
    ///
    /// Once this returns, the queues are never refilled by that worker.
    pub fn stop_populate(&self) {
        let mut queues = self.shared.lock();
        self.shared.stop.store(true, Ordering::SeqCst);
        if queues.status == PrecomputeStatus::Running {
            queues.status = PrecomputeStatus::Stopped;
        }
        self.shared.space_available.notify_all();
    }

    pub fn status(&self) -> PrecomputeStatus {
        self.shared.lock().status.clone()
    }

    pub fn public_key(&self) -> Option<ElementModP> {
        self.shared.lock().public_key.clone()
    }

    pub fn get_max_queue_size(&self) -> usize {
        self.shared.lock().max_size
    }

    /// Triples are consumed twice as fast, so their queue holds twice as many
    pub fn get_max_triple_queue_size(&self) -> usize {
        self.shared.lock().max_triples()
    }

    /// Number of queued bundles
    pub fn get_current_queue_size(&self) -> usize {
        self.shared.lock().bundles.len()
    }

    pub fn get_current_triple_queue_size(&self) -> usize {
        self.shared.lock().triples.len()
    }

    /// Pop a bundle, generating one on the spot if the queue is empty
    pub fn get_two_triples_and_a_quadruple(&self) -> Result<TwoTriplesAndAQuadruple, Error> {
        let public_key = {
            let mut queues = self.shared.lock();
            if let Some(bundle) = queues.bundles.pop_front() {
                self.shared.space_available.notify_one();
                return Ok(bundle);
            }
            queues.public_key.clone().ok_or(Error::PrecomputeNotPopulated)?
        };

        debug!("precompute bundle queue empty, generating on demand");
        Ok(TwoTriplesAndAQuadruple::generate(&public_key))
    }

    /// Pop a triple, generating one on the spot if the queue is empty
    pub fn get_triple(&self) -> Result<Triple, Error> {
        let public_key = {
            let mut queues = self.shared.lock();
            if let Some(triple) = queues.triples.pop_front() {
                self.shared.space_available.notify_one();
                return Ok(triple);
            }
            queues.public_key.clone().ok_or(Error::PrecomputeNotPopulated)?
        };

        debug!("precompute triple queue empty, generating on demand");
        Ok(Triple::generate(&public_key))
    }

    /// Discard every queued bundle and triple
    pub fn empty_queues(&self) {
        self.shared.lock().clear();
        self.shared.space_available.notify_all();
    }
}

impl Drop for PrecomputeBuffer {
    fn drop(&mut self) {
        self.stop_populate();
        let handle = self
            .worker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            join_worker(handle);
        }
    }
}

fn queue_size(max_size: usize) -> usize {
    if max_size == 0 {
        DEFAULT_PRECOMPUTE_SIZE
    } else {
        max_size
    }
}

fn join_worker(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        error!("precompute worker could not be joined");
    }
}

fn run_worker(shared: Arc<Shared>, public_key: ElementModP) {
    info!("precompute worker started");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| fill_queues(&shared, &public_key)));

    let mut queues = shared.lock();
    match outcome {
        Ok(()) => {
            if queues.status == PrecomputeStatus::Running {
                queues.status = PrecomputeStatus::Stopped;
            }
            info!(
                "precompute worker stopped with {} bundles and {} triples queued",
                queues.bundles.len(),
                queues.triples.len()
            );
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("precompute worker failed: {}", message);
            queues.status = PrecomputeStatus::Failed(message);
        }
    }
}

fn fill_queues(shared: &Shared, public_key: &ElementModP) {
    loop {
        let (need_bundle, need_triples) = {
            let mut queues = shared.lock();
            while !shared.stop_requested() && queues.is_full() {
                queues = shared
                    .space_available
                    .wait(queues)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if shared.stop_requested() {
                return;
            }
            queues.shortfall()
        };

        // Generated outside the lock; stop is only observed between rounds
        let bundle = if need_bundle {
            Some(TwoTriplesAndAQuadruple::generate(public_key))
        } else {
            None
        };
        let triples: Vec<Triple> = (0..need_triples)
            .map(|_| Triple::generate(public_key))
            .collect();

        let mut queues = shared.lock();
        if shared.stop_requested() {
            return;
        }
        if let Some(bundle) = bundle {
            if queues.bundles.len() < queues.max_size {
                queues.bundles.push_back(bundle);
            }
        }
        for triple in triples {
            if queues.triples.len() < queues.max_triples() {
                queues.triples.push_back(triple);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
