//! Очередь заявок к одному исполнителю
//!
//! Вызывающие задачи ставят заявку (`submit`) и ждут `Completion`.
//! Исполнитель (`serve`) выполняет работу по одной заявке за раз, в порядке
//! поступления, и не берёт следующую, пока результат предыдущей не забран.
//! Заявки `run_inline` стоят в той же очереди, но выполняются самим
//! вызывающим, когда подходит их очередь.

use core::cell::RefCell;
use core::fmt;
use core::future::{poll_fn, Future};
use core::pin::Pin;
use core::task::{Context, Poll};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::{MultiWakerRegistration, WakerRegistration};
use heapless::Deque;

/// Очередь закрыта, заявка не будет выполнена
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Closed;

impl fmt::Display for Closed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dispatch closed")
    }
}

type Ticket = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    ticket: Ticket,
    /// Выполняется вызывающим, а не исполнителем
    inline: bool,
}

struct State<T, const N: usize> {
    next_ticket: Ticket,
    queue: Deque<Entry, N>,
    /// Заявка, которая сейчас выполняется
    running: Option<Ticket>,
    /// Владелец выполняемой заявки перестал ждать
    abandoned: bool,
    /// Результат, ещё не забранный владельцем
    finished: Option<(Ticket, T)>,
    closed: bool,
    worker: WakerRegistration,
    callers: MultiWakerRegistration<N>,
}

impl<T, const N: usize> State<T, N> {
    /// Убрать заявку из очереди, сохранив порядок остальных
    fn cancel_queued(&mut self, ticket: Ticket) -> bool {
        let mut found = false;
        for _ in 0..self.queue.len() {
            if let Some(queued) = self.queue.pop_front() {
                if queued.ticket == ticket {
                    found = true;
                } else {
                    let _ = self.queue.push_back(queued);
                }
            }
        }
        found
    }
}

pub struct Dispatch<M: RawMutex, T, const N: usize> {
    state: Mutex<M, RefCell<State<T, N>>>,
}

impl<M: RawMutex, T, const N: usize> Dispatch<M, T, N> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::const_new(
                M::INIT,
                RefCell::new(State {
                    next_ticket: 0,
                    queue: Deque::new(),
                    running: None,
                    abandoned: false,
                    finished: None,
                    closed: false,
                    worker: WakerRegistration::new(),
                    callers: MultiWakerRegistration::new(),
                }),
            ),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State<T, N>) -> R) -> R {
        self.state.lock(|cell| f(&mut cell.borrow_mut()))
    }

    async fn enqueue(&self, inline: bool) -> Result<Ticket, Closed> {
        poll_fn(|cx| {
            self.with_state(|s| {
                if s.closed {
                    return Poll::Ready(Err(Closed));
                }
                let ticket = s.next_ticket;
                if s.queue.push_back(Entry { ticket, inline }).is_err() {
                    s.callers.register(cx.waker());
                    return Poll::Pending;
                }
                s.next_ticket = ticket.wrapping_add(1);
                s.worker.wake();
                Poll::Ready(Ok(ticket))
            })
        })
        .await
    }

    /// Поставить заявку в очередь.
    ///
    /// Если очередь заполнена, ждёт свободного места.
    pub async fn submit(&self) -> Result<Completion<'_, M, T, N>, Closed> {
        let ticket = self.enqueue(false).await?;

        Ok(Completion {
            dispatch: self,
            ticket,
            done: false,
        })
    }

    /// Цикл исполнителя. Завершается после `close()`.
    ///
    /// `work` вызывается ровно один раз на каждую заявку.
    pub async fn serve<F, Fut>(&self, mut work: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
    {
        while let Some(ticket) = self.next_job().await {
            let _running = RunningGuard {
                dispatch: self,
                ticket,
            };
            let outcome = work().await;
            self.finish(ticket, outcome);
        }
    }

    /// Выполнить `work` в контексте вызывающего, в общей очереди.
    ///
    /// Ждёт, пока завершатся все ранее поставленные заявки. Неполученный
    /// результат заявки исполнителя не задерживает.
    pub async fn run_inline<R>(&self, work: impl FnOnce() -> R) -> Result<R, Closed> {
        let ticket = self.enqueue(true).await?;
        let mut turn = InlineTurn {
            dispatch: self,
            ticket,
            claimed: false,
        };

        poll_fn(|cx| {
            self.with_state(|s| {
                let front = s.queue.front().map(|e| e.ticket);
                if front == Some(ticket) && s.running.is_none() {
                    s.queue.pop_front();
                    s.running = Some(ticket);
                    s.callers.wake();
                    return Poll::Ready(Ok(()));
                }
                if !s.queue.iter().any(|e| e.ticket == ticket) {
                    return Poll::Ready(Err(Closed));
                }
                s.callers.register(cx.waker());
                Poll::Pending
            })
        })
        .await?;

        turn.claimed = true;
        Ok(work())
    }

    async fn next_job(&self) -> Option<Ticket> {
        poll_fn(|cx| {
            self.with_state(|s| {
                if s.closed {
                    return Poll::Ready(None);
                }
                let ready = s.finished.is_none()
                    && s.running.is_none()
                    && s.queue.front().is_some_and(|e| !e.inline);
                if ready {
                    if let Some(entry) = s.queue.pop_front() {
                        s.running = Some(entry.ticket);
                        s.abandoned = false;
                        // освободилось место в очереди
                        s.callers.wake();
                        return Poll::Ready(Some(entry.ticket));
                    }
                }
                s.worker.register(cx.waker());
                Poll::Pending
            })
        })
        .await
    }

    fn finish(&self, ticket: Ticket, outcome: T) {
        self.with_state(|s| {
            s.running = None;
            if core::mem::take(&mut s.abandoned) {
                log_trace!("Заявка {} брошена, результат отброшен", ticket);
                s.worker.wake();
            } else {
                s.finished = Some((ticket, outcome));
            }
            s.callers.wake();
        });
    }

    /// Закрыть очередь: ждущие в очереди заявки завершаются с `Closed`,
    /// выполняемая доводится до конца.
    pub fn close(&self) {
        self.with_state(|s| {
            s.closed = true;
            s.queue.clear();
            s.worker.wake();
            s.callers.wake();
        });
    }

    pub fn is_closed(&self) -> bool {
        self.with_state(|s| s.closed)
    }

    /// Выполняется заявка или её результат ещё не забран
    pub fn in_flight(&self) -> bool {
        self.with_state(|s| s.running.is_some() || s.finished.is_some())
    }

    /// Заявок в очереди
    pub fn pending(&self) -> usize {
        self.with_state(|s| s.queue.len())
    }
}

impl<M: RawMutex, T, const N: usize> Default for Dispatch<M, T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Место заявки `run_inline`: до начала работы снимается с очереди,
/// после неё освобождает очередь для следующих
struct InlineTurn<'a, M: RawMutex, T, const N: usize> {
    dispatch: &'a Dispatch<M, T, N>,
    ticket: Ticket,
    claimed: bool,
}

impl<M: RawMutex, T, const N: usize> Drop for InlineTurn<'_, M, T, N> {
    fn drop(&mut self) {
        let ticket = self.ticket;
        let claimed = self.claimed;
        self.dispatch.with_state(|s| {
            if claimed {
                if s.running == Some(ticket) {
                    s.running = None;
                }
            } else {
                s.cancel_queued(ticket);
            }
            s.worker.wake();
            s.callers.wake();
        });
    }
}

/// Снимает отметку о выполнении, если `serve` прерван посреди работы
struct RunningGuard<'a, M: RawMutex, T, const N: usize> {
    dispatch: &'a Dispatch<M, T, N>,
    ticket: Ticket,
}

impl<M: RawMutex, T, const N: usize> Drop for RunningGuard<'_, M, T, N> {
    fn drop(&mut self) {
        self.dispatch.with_state(|s| {
            if s.running == Some(self.ticket) {
                s.running = None;
                s.abandoned = false;
                s.callers.wake();
            }
        });
    }
}

/// Результат заявки.
///
/// Сброс до получения результата отменяет заявку в очереди; уже начатая
/// работа доводится до конца, её результат отбрасывается.
pub struct Completion<'a, M: RawMutex, T, const N: usize> {
    dispatch: &'a Dispatch<M, T, N>,
    ticket: Ticket,
    done: bool,
}

impl<M: RawMutex, T, const N: usize> Future for Completion<'_, M, T, N> {
    type Output = Result<T, Closed>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(Err(Closed));
        }

        let ticket = this.ticket;
        let poll = this.dispatch.with_state(|s| {
            if s.finished.as_ref().is_some_and(|(t, _)| *t == ticket) {
                if let Some((_, outcome)) = s.finished.take() {
                    s.worker.wake();
                    return Poll::Ready(Ok(outcome));
                }
            }

            let waiting = s.running == Some(ticket) || s.queue.iter().any(|e| e.ticket == ticket);
            if !waiting {
                return Poll::Ready(Err(Closed));
            }

            s.callers.register(cx.waker());
            Poll::Pending
        });

        if poll.is_ready() {
            this.done = true;
        }
        poll
    }
}

impl<M: RawMutex, T, const N: usize> Drop for Completion<'_, M, T, N> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let ticket = self.ticket;
        self.dispatch.with_state(|s| {
            if s.finished.as_ref().is_some_and(|(t, _)| *t == ticket) {
                s.finished = None;
                s.worker.wake();
            } else if s.running == Some(ticket) {
                s.abandoned = true;
            } else if s.cancel_queued(ticket) {
                s.callers.wake();
            }
        });
    }
}
